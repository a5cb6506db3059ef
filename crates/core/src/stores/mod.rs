pub mod github;

pub use github::GithubStore;
