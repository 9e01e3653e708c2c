mod console_tests;
mod session_tests;
