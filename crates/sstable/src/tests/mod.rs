mod merge_tests;
mod table_tests;
