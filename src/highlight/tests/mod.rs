mod coordinator_tests;
