pub mod github;
pub mod stackexchange;

pub use github::GithubSearch;
pub use stackexchange::StackExchangeSearch;
