mod integration {
    mod action_tests;
    mod config_tests;
    mod controller_tests;
    mod scan_tests;
}
