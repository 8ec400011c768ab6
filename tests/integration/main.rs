mod api_test;
mod support;
