mod reconcile_tests;
mod support;
