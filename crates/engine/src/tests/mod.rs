mod e2e_tests;
mod helpers;
