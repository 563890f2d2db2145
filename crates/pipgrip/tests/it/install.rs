use pipgrip_test::pipgrip_snapshot;

#[test]
fn install() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["--install", "--no-compile", "requests==2.22.0"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    requests==2.22.0
    chardet==3.0.4
    idna==2.8
    urllib3==1.25.11
    certifi==2024.8.30
    Successfully installed requests==2.22.0 chardet==3.0.4 idna==2.8 urllib3==1.25.11 certifi==2024.8.30

    ----- stderr -----
    ");

    insta::assert_debug_snapshot!(context.pip_invocations(), @r#"
    [
        "pip install --dry-run --ignore-installed --quiet --no-input --disable-pip-version-check --report [TEMP] --only-binary=:all: requests==2.22.0",
        "pip install --only-binary=:all: requests==2.22.0 chardet==3.0.4 idna==2.8 urllib3==1.25.11 certifi==2024.8.30",
    ]
    "#);
}

#[test]
fn install_user() {
    let context = pipgrip_test::test_context!();

    let output = context
        .command()
        .args(["--install", "--user", "six"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let invocations = context.pip_invocations();
    assert_eq!(invocations[1], "pip install --user six==1.16.0");
}

#[test]
fn install_failure() {
    let context = pipgrip_test::test_context!().with_failing_install(1);

    pipgrip_snapshot!(context.filters(), context.command().args(["--install", "six"]), @r"
    success: false
    exit_code: 1
    ----- stdout -----
    six==1.16.0

    ----- stderr -----
    ERROR: Could not install packages due to an OSError
    ");
}

#[test]
fn user_without_install() {
    let context = pipgrip_test::test_context!();

    let output = context.command().args(["--user", "six"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(context.pip_invocations().is_empty());
}
