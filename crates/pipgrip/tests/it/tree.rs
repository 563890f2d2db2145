use anyhow::Result;

use pipgrip_test::pipgrip_snapshot;

#[test]
fn tree() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["--tree", "requests==2.22.0", "six"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    requests==2.22.0 (2.22.0)
    ├── chardet<3.1.0,>=3.0.2 (3.0.4)
    ├── idna<2.9,>=2.5 (2.8)
    ├── urllib3!=1.25.0,!=1.25.1,<1.26,>=1.21.1 (1.25.11)
    └── certifi>=2017.4.17 (2024.8.30)
    six (1.16.0)

    ----- stderr -----
    ");
}

#[test]
fn tree_ascii() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["--tree-ascii", "--sort", "requests==2.22.0"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    requests==2.22.0 (2.22.0)
    |-- certifi>=2017.4.17 (2024.8.30)
    |-- chardet<3.1.0,>=3.0.2 (3.0.4)
    |-- idna<2.9,>=2.5 (2.8)
    +-- urllib3!=1.25.0,!=1.25.1,<1.26,>=1.21.1 (1.25.11)

    ----- stderr -----
    ");
}

#[test]
fn max_depth() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["--tree", "--max-depth", "1", "requests==2.22.0"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    requests==2.22.0 (2.22.0)

    ----- stderr -----
    ");

    // Zero and negative depths are unlimited.
    pipgrip_snapshot!(context.filters(), context.command().args(["--tree", "--max-depth", "-1", "six"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    six (1.16.0)

    ----- stderr -----
    ");
}

#[test]
fn max_depth_without_tree() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["--max-depth", "1", "six"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    six==1.16.0

    ----- stderr -----
    warning: `--max-depth` has no effect without a tree output
    ");
}

#[test]
fn reversed_tree() {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["--reversed-tree", "requests==2.22.0"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    chardet==3.0.4
    └── requests==2.22.0 [requires: chardet<3.1.0,>=3.0.2]
    idna==2.8
    └── requests==2.22.0 [requires: idna<2.9,>=2.5]
    urllib3==1.25.11
    └── requests==2.22.0 [requires: urllib3!=1.25.0,!=1.25.1,<1.26,>=1.21.1]
    certifi==2024.8.30
    └── requests==2.22.0 [requires: certifi>=2017.4.17]

    ----- stderr -----
    ");
}

#[test]
fn tree_json() -> Result<()> {
    let context = pipgrip_test::test_context!();

    pipgrip_snapshot!(context.filters(), context.command().args(["--tree", "--json", "requests==2.22.0"]), @r#"
    success: true
    exit_code: 0
    ----- stdout -----
    [{"name":"requests","version":"2.22.0","dependencies":[{"name":"chardet","version":"3.0.4"},{"name":"idna","version":"2.8"},{"name":"urllib3","version":"1.25.11"},{"name":"certifi","version":"2024.8.30"}]}]

    ----- stderr -----
    "#);

    let output = context
        .command()
        .args(["--tree", "--json", "requests==2.22.0", "six"])
        .output()?;
    assert!(output.status.success());
    let packages: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout)?;
    assert_eq!(packages.len(), 2);

    let requests = &packages[0];
    assert_eq!(requests["name"], "requests");
    assert_eq!(requests["version"], "2.22.0");
    let dependencies = requests["dependencies"]
        .as_array()
        .expect("requests has dependencies");
    assert!(
        dependencies
            .iter()
            .any(|dependency| dependency["name"] == "certifi")
    );

    // A package without dependencies has no `dependencies` key.
    let six = &packages[1];
    assert_eq!(six["name"], "six");
    assert_eq!(six["version"], "1.16.0");
    assert!(six.get("dependencies").is_none());
    Ok(())
}

#[test]
fn reversed_tree_json() -> Result<()> {
    let context = pipgrip_test::test_context!();

    let output = context
        .command()
        .args(["--reversed-tree", "--json", "requests==2.22.0"])
        .output()?;
    assert!(output.status.success());
    let packages: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout)?;
    let names = packages
        .iter()
        .map(|package| package["name"].as_str().unwrap_or_default())
        .collect::<Vec<_>>();
    assert_eq!(names, ["chardet", "idna", "urllib3", "certifi"]);
    for package in &packages {
        assert_eq!(package["dependents"][0]["name"], "requests");
    }
    Ok(())
}
