mod migration_test;
mod version_test;
