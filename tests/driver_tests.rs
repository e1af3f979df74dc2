//! End-to-end tests against a fake `isolate` stand-in installed on a
//! per-test `PATH`, since the real sandbox binary needs a Linux host with
//! cgroups the test environment may lack.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use judge_core::config::JudgeConfig;
use judge_core::driver::{JudgeDriver, JudgeOptions};
use judge_core::language::Language;
use judge_core::source::SourceCode;
use judge_core::testcase::Testcase;
use judge_core::verdict::Verdict;

const AQAASM_SRC: &str = include_str!("../assets/aqaasm.py");

fn unique_dir(label: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "judge_core_it_{label}_{}_{}",
        std::process::id(),
        nanos
    ));
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Writes a fake `isolate` that runs the requested program directly (no
/// real cgroup sandboxing) and fabricates a plausible metadata file,
/// enforcing only the wall-clock limit via `timeout`.
fn write_fake_isolate(box_root: &Path) -> PathBuf {
    let script_path = box_root.join("isolate");
    let contents = format!(
        r#"#!/usr/bin/env bash
set -u
BOX_ROOT="{box_root}"
mode=""
box_id=""
meta=""
wall="5"
prog=()
while [[ $# -gt 0 ]]; do
  case "$1" in
    --version) exit 0 ;;
    --box-id) box_id="$2"; shift 2 ;;
    --init) mode="init"; shift ;;
    --cleanup) mode="cleanup"; shift ;;
    --run) mode="run"; shift ;;
    -M) meta="$2"; shift 2 ;;
    -t) shift 2 ;;
    -w) wall="$2"; shift 2 ;;
    -m) shift 2 ;;
    --) shift; prog=("$@"); break ;;
    *) shift ;;
  esac
done

box_dir="$BOX_ROOT/boxes/$box_id"

if [[ "$mode" == "init" ]]; then
  mkdir -p "$box_dir/box"
  echo "$box_dir"
  exit 0
fi

if [[ "$mode" == "cleanup" ]]; then
  rm -rf "$box_dir"
  exit 0
fi

if [[ "$mode" == "run" ]]; then
  cd "$box_dir/box"
  timeout "$wall" "${{prog[@]}}"
  code=$?
  if [[ $code -eq 124 ]]; then
    status=TO
  elif [[ $code -ne 0 ]]; then
    status=RE
  else
    status=OK
  fi
  {{
    echo "time:0.05"
    echo "max-rss:1000"
    echo "status:$status"
  }} > "$meta"
  exit $code
fi
"#,
        box_root = box_root.display()
    );
    fs::write(&script_path, contents).unwrap();
    let mut perms = fs::metadata(&script_path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&script_path, perms).unwrap();
    script_path
}

struct Harness {
    config: JudgeConfig,
}

impl Harness {
    fn new() -> Self {
        let root = unique_dir("root");
        let isolate_binary = write_fake_isolate(&root);
        let interpreter_path = root.join("aqaasm.py");
        fs::write(&interpreter_path, AQAASM_SRC).unwrap();

        let config = JudgeConfig {
            python_path: PathBuf::from("python3"),
            aqaasm_interpreter_path: interpreter_path,
            cpp_compile_flags: vec!["-std=c++17".to_string()],
            max_box: 10,
            metadata_folder: unique_dir("metadata"),
            isolate_binary: isolate_binary.to_string_lossy().into_owned(),
        };
        Self { config }
    }
}

#[test]
fn python_ac() {
    let harness = Harness::new();
    let mut driver = JudgeDriver::acquire(harness.config.clone()).expect("acquire sandbox");
    let mut source = SourceCode::new("print(int(input())*2)", Language::PYTHON);
    let testcases = vec![Testcase::new("21\n", "42\n")];
    let mut options = JudgeOptions::new(1000, 65536);

    let mut results = Vec::new();
    driver
        .judge(&mut source, &testcases, &mut options, |r| {
            results.push(r);
            true
        })
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].verdict, Verdict::AC);
}

#[test]
fn python_wa() {
    let harness = Harness::new();
    let mut driver = JudgeDriver::acquire(harness.config.clone()).expect("acquire sandbox");
    let mut source = SourceCode::new("print(0)", Language::PYTHON);
    let testcases = vec![Testcase::new("", "1\n")];
    let mut options = JudgeOptions::new(1000, 65536);

    let mut results = Vec::new();
    driver
        .judge(&mut source, &testcases, &mut options, |r| {
            results.push(r);
            true
        })
        .unwrap();

    assert_eq!(results[0].verdict, Verdict::WA);
}

#[test]
fn python_tle() {
    let harness = Harness::new();
    let mut driver = JudgeDriver::acquire(harness.config.clone()).expect("acquire sandbox");
    let mut source = SourceCode::new("while True: pass", Language::PYTHON);
    let testcases = vec![Testcase::new("", "")];
    let mut options = JudgeOptions::new(500, 65536);

    let mut results = Vec::new();
    driver
        .judge(&mut source, &testcases, &mut options, |r| {
            results.push(r);
            true
        })
        .unwrap();

    assert_eq!(results[0].verdict, Verdict::TLE);
}

#[test]
fn cpp_compile_error_short_circuits_subsequent_testcases() {
    let harness = Harness::new();
    let mut driver = JudgeDriver::acquire(harness.config.clone()).expect("acquire sandbox");
    let mut source = SourceCode::new("int main(){ return ; }", Language::CPLUSPLUS);
    let testcases = vec![Testcase::new("", ""), Testcase::new("", "")];
    let mut options = JudgeOptions::new(1000, 65536);

    let mut results = Vec::new();
    driver
        .judge(&mut source, &testcases, &mut options, |r| {
            results.push(r);
            true
        })
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].verdict, Verdict::CE);
    assert!(!results[0].message.is_empty());
    assert_eq!(results[1].verdict, Verdict::CE);
    assert_eq!(results[1].message, "See error details in the first testcase.");
}

#[test]
fn aqaasm_add() {
    let harness = Harness::new();
    let mut driver = JudgeDriver::acquire(harness.config.clone()).expect("acquire sandbox");
    let mut source = SourceCode::new(
        "MOV R0, #5\nMOV R1, #7\nADD R2, R0, R1\nSTR R2, 101\nHALT",
        Language::AQAASM,
    );
    let testcases = vec![Testcase::new("0\n", "12\n")];
    let mut options = JudgeOptions::new(1000, 65536);

    let mut results = Vec::new();
    driver
        .judge(&mut source, &testcases, &mut options, |r| {
            results.push(r);
            true
        })
        .unwrap();

    assert_eq!(results[0].verdict, Verdict::AC);
}

#[test]
fn grader_path_accepts_and_flags_unexpected_output() {
    let grader_says = |grader_code: &str, input: &str| {
        let harness = Harness::new();
        let mut driver = JudgeDriver::acquire(harness.config.clone()).expect("acquire sandbox");
        let mut source = SourceCode::new("print('hello')", Language::PYTHON);
        let mut grader = SourceCode::new(grader_code, Language::PYTHON);
        let testcases = vec![Testcase::new(input, "")];
        let mut options = JudgeOptions::new(1000, 65536);
        options.grader = Some(&mut grader);

        let mut results = Vec::new();
        driver
            .judge(&mut source, &testcases, &mut options, |r| {
                results.push(r);
                true
            })
            .unwrap();
        results.remove(0).verdict
    };

    let accepting_grader = "import sys\nprint('AC' if 'hello' in sys.stdin.read() else 'WA')";
    assert_eq!(grader_says(accepting_grader, ""), Verdict::AC);

    let confused_grader = "print('maybe')";
    assert_eq!(grader_says(confused_grader, ""), Verdict::SE);
}
