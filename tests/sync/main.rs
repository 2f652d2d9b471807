// Test binary entry point for sync tests
// Strategy, caching, and engine tests organized here


mod engine_tests;
mod strategy_tests;
