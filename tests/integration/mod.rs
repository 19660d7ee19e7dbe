pub mod concurrency_tests;
pub mod failure_tests;
