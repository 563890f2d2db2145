use anyhow::Result;
use assert_fs::prelude::*;
use predicates::prelude::predicate;

use pipgrip_test::pipgrip_snapshot;

#[test]
fn lock() -> Result<()> {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["--lock", "--tree", "requests==2.22.0"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    requests==2.22.0 (2.22.0)
    ├── chardet<3.1.0,>=3.0.2 (3.0.4)
    ├── idna<2.9,>=2.5 (2.8)
    ├── urllib3!=1.25.0,!=1.25.1,<1.26,>=1.21.1 (1.25.11)
    └── certifi>=2017.4.17 (2024.8.30)

    ----- stderr -----
    ");

    let lock = context.temp_dir.child("pipgrip.lock");
    insta::assert_snapshot!(fs_err::read_to_string(&lock)?, @r"
    requests==2.22.0
    chardet==3.0.4
    idna==2.8
    urllib3==1.25.11
    certifi==2024.8.30
    ");
    Ok(())
}

#[test]
fn lock_sorted() -> Result<()> {
    let context = pipgrip_test::test_context!();

    context
        .command()
        .args(["--lock", "--sort", "--json", "requests==2.22.0", "six"])
        .output()?;

    context.temp_dir.child("pipgrip.lock").assert(
        "certifi==2024.8.30\nchardet==3.0.4\nidna==2.8\nrequests==2.22.0\nsix==1.16.0\nurllib3==1.25.11\n",
    );
    Ok(())
}

#[test]
fn lock_skipped() -> Result<()> {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["--lock", "--skip-invalid-input", "--pipe", "nonexistent-package", "six"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    nonexistent-package six==1.16.0

    ----- stderr -----
    warning: Skipping `nonexistent-package`, which failed to resolve: ERROR: No matching distribution found for nonexistent-package
    warning: Leaving the skipped `nonexistent-package` out of the lock file
    ");

    context
        .temp_dir
        .child("pipgrip.lock")
        .assert(predicate::eq("six==1.16.0\n"));
    Ok(())
}
