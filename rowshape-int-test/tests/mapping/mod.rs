mod mapping_test;
