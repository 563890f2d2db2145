use std::str::FromStr;

use pipgrip_interpreter::PipReport;
use pipgrip_pep508::Requirement;
use pipgrip_resolver::{Resolution, SkippedRequirement};

use crate::settings::{OutputFormat, OutputSettings, TreeSettings, TreeStyle};

use super::render;

fn requests_report() -> PipReport {
    serde_json::from_str(include_str!(
        "../../../../../test-data/reports/requests==2.22.0.json"
    ))
    .unwrap()
}

fn requirements(requirements: &[&str]) -> Vec<Requirement> {
    requirements
        .iter()
        .map(|requirement| Requirement::from_str(requirement).unwrap())
        .collect()
}

/// `requests==2.22.0` and `gevent==20.9.0`, which pip failed to report on.
fn with_skipped() -> Resolution {
    let report = requests_report();
    Resolution::from_report(
        &requirements(&["requests==2.22.0", "gevent==20.9.0"]),
        Some(&report),
        vec![SkippedRequirement {
            requirement: Requirement::from_str("gevent==20.9.0").unwrap(),
            error: pipgrip_interpreter::Error::NotFound,
        }],
    )
}

/// `a` depends on `b` which depends on `a`.
fn cycle() -> Resolution {
    let report: PipReport = serde_json::from_str(
        r#"{
            "version": "1",
            "install": [
                {
                    "metadata": {"name": "a", "version": "1.0", "requires_dist": ["b"]},
                    "requested": true
                },
                {
                    "metadata": {"name": "b", "version": "2.0", "requires_dist": ["a>=1"]}
                }
            ],
            "environment": {
                "implementation_name": "cpython",
                "implementation_version": "3.12.4",
                "os_name": "posix",
                "platform_machine": "x86_64",
                "platform_python_implementation": "CPython",
                "platform_release": "6.1.0",
                "platform_system": "Linux",
                "platform_version": "1",
                "python_full_version": "3.12.4",
                "python_version": "3.12",
                "sys_platform": "linux"
            }
        }"#,
    )
    .unwrap();
    Resolution::from_report(&requirements(&["a"]), Some(&report), Vec::new())
}

fn output(format: OutputFormat) -> OutputSettings {
    OutputSettings {
        format,
        sort: false,
    }
}

fn tree(style: TreeStyle, reversed: bool, json: bool, max_depth: Option<usize>) -> OutputSettings {
    output(OutputFormat::Tree(TreeSettings {
        style,
        reversed,
        json,
        max_depth,
    }))
}

#[test]
fn flat() {
    let resolution = with_skipped();
    insta::assert_snapshot!(render(&resolution, output(OutputFormat::Flat)).unwrap(), @r"
    requests==2.22.0
    chardet==3.0.4
    idna==2.8
    urllib3==1.25.11
    certifi==2024.8.30
    gevent==20.9.0
    ");
}

#[test]
fn flat_sorted() {
    let resolution = with_skipped();
    let settings = OutputSettings {
        format: OutputFormat::Pipe,
        sort: true,
    };
    insta::assert_snapshot!(render(&resolution, settings).unwrap(), @"certifi==2024.8.30 chardet==3.0.4 gevent==20.9.0 idna==2.8 requests==2.22.0 urllib3==1.25.11");
}

#[test]
fn flat_json() {
    let resolution = with_skipped();
    let json = render(&resolution, output(OutputFormat::Json)).unwrap();
    insta::assert_snapshot!(json, @r#"{"requests":"2.22.0","chardet":"3.0.4","idna":"2.8","urllib3":"1.25.11","certifi":"2024.8.30","gevent":"20.9.0"}"#);
}

#[test]
fn skipped_without_pin() {
    let resolution = Resolution::from_report(
        &requirements(&["nonexistent-package>=1"]),
        None,
        vec![SkippedRequirement {
            requirement: Requirement::from_str("nonexistent-package>=1").unwrap(),
            error: pipgrip_interpreter::Error::NotFound,
        }],
    );
    insta::assert_snapshot!(render(&resolution, output(OutputFormat::Flat)).unwrap(), @"nonexistent-package>=1");
    insta::assert_snapshot!(render(&resolution, output(OutputFormat::Json)).unwrap(), @r#"{"nonexistent-package":null}"#);
}

#[test]
fn empty() {
    let resolution = Resolution::default();
    assert_eq!(render(&resolution, output(OutputFormat::Flat)).unwrap(), "");
    assert_eq!(render(&resolution, output(OutputFormat::Pipe)).unwrap(), "");
    assert_eq!(render(&resolution, output(OutputFormat::Json)).unwrap(), "{}\n");
}

#[test]
fn unicode_tree() {
    let resolution = with_skipped();
    insta::assert_snapshot!(render(&resolution, tree(TreeStyle::Unicode, false, false, None)).unwrap(), @r"
    requests==2.22.0 (2.22.0)
    ├── chardet<3.1.0,>=3.0.2 (3.0.4)
    ├── idna<2.9,>=2.5 (2.8)
    ├── urllib3!=1.25.0,!=1.25.1,<1.26,>=1.21.1 (1.25.11)
    └── certifi>=2017.4.17 (2024.8.30)
    gevent==20.9.0 (skipped)
    ");
}

#[test]
fn ascii_tree_sorted() {
    let resolution = with_skipped();
    let settings = OutputSettings {
        sort: true,
        ..tree(TreeStyle::Ascii, false, false, None)
    };
    insta::assert_snapshot!(render(&resolution, settings).unwrap(), @r"
    gevent==20.9.0 (skipped)
    requests==2.22.0 (2.22.0)
    |-- certifi>=2017.4.17 (2024.8.30)
    |-- chardet<3.1.0,>=3.0.2 (3.0.4)
    |-- idna<2.9,>=2.5 (2.8)
    +-- urllib3!=1.25.0,!=1.25.1,<1.26,>=1.21.1 (1.25.11)
    ");
}

#[test]
fn max_depth() {
    let resolution = with_skipped();
    insta::assert_snapshot!(render(&resolution, tree(TreeStyle::Unicode, false, false, Some(1))).unwrap(), @r"
    requests==2.22.0 (2.22.0)
    gevent==20.9.0 (skipped)
    ");
}

#[test]
fn cyclic() {
    let resolution = cycle();
    insta::assert_snapshot!(render(&resolution, tree(TreeStyle::Unicode, false, false, None)).unwrap(), @r"
    a (1.0)
    └── b (2.0)
        └── a>=1 (1.0, cyclic)
    ");
    insta::assert_snapshot!(render(&resolution, tree(TreeStyle::Unicode, false, true, None)).unwrap(), @r#"[{"name":"a","version":"1.0","dependencies":[{"name":"b","version":"2.0","dependencies":[{"name":"a","version":"1.0"}]}]}]"#);
}

#[test]
fn tree_json() {
    let resolution = with_skipped();
    let json = render(&resolution, tree(TreeStyle::Unicode, false, true, None)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    insta::assert_json_snapshot!(value, @r#"
    [
      {
        "dependencies": [
          {
            "name": "chardet",
            "version": "3.0.4"
          },
          {
            "name": "idna",
            "version": "2.8"
          },
          {
            "name": "urllib3",
            "version": "1.25.11"
          },
          {
            "name": "certifi",
            "version": "2024.8.30"
          }
        ],
        "name": "requests",
        "version": "2.22.0"
      },
      {
        "name": "gevent",
        "version": "20.9.0"
      }
    ]
    "#);
}

#[test]
fn reversed_tree() {
    let resolution = with_skipped();
    insta::assert_snapshot!(render(&resolution, tree(TreeStyle::Unicode, true, false, None)).unwrap(), @r"
    chardet==3.0.4
    └── requests==2.22.0 [requires: chardet<3.1.0,>=3.0.2]
    idna==2.8
    └── requests==2.22.0 [requires: idna<2.9,>=2.5]
    urllib3==1.25.11
    └── requests==2.22.0 [requires: urllib3!=1.25.0,!=1.25.1,<1.26,>=1.21.1]
    certifi==2024.8.30
    └── requests==2.22.0 [requires: certifi>=2017.4.17]
    gevent==20.9.0 (skipped)
    ");
}

#[test]
fn reversed_tree_json() {
    let resolution = cycle();
    // Every package in a cycle has dependencies, so there is no leaf to start from.
    assert_eq!(
        render(&resolution, tree(TreeStyle::Unicode, true, true, None)).unwrap(),
        "[]\n"
    );

    let resolution = with_skipped();
    let json = render(&resolution, tree(TreeStyle::Unicode, true, true, Some(2))).unwrap();
    let value: Vec<serde_json::Value> = serde_json::from_str(&json).unwrap();
    assert_eq!(value.len(), 5);
    assert_eq!(value[0]["dependents"][0]["name"], "requests");
    assert!(value[4].get("dependents").is_none());
}
