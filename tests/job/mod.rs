// Test module entry point for job tests
// Controller, worker process and CLI behavior

mod cli_tests;
mod process_tests;
