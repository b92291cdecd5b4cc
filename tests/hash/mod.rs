// Test module entry point for hash tests
// All checksum engine tests organized here

mod utility_tests; // path_utils and enumerate tests
