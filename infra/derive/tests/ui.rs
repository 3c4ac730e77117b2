#[test]
fn nosh_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/nosh_error_pass.rs");
}
