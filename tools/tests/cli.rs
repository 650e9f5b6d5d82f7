use std::{
    io::Write,
    process::{Command, Output, Stdio},
};

fn run_file(data: &str, args: &[&str]) -> Output {
    let mut file = tempfile::Builder::new().suffix(".wcnf").tempfile().unwrap();
    file.write_all(data.as_bytes()).unwrap();
    file.flush().unwrap();
    Command::new(env!("CARGO_BIN_EXE_smax"))
        .arg(file.path())
        .args(args)
        .output()
        .unwrap()
}

/// The non-comment lines of the output
fn lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter(|l| !l.starts_with('c'))
        .map(str::to_owned)
        .collect()
}

#[test]
fn optimal_wcnf() {
    let output = run_file("p wcnf 2 4 10\n10 -1 -2 0\n3 1 0\n4 2 0\n0 1 2 0\n", &[]);
    assert_eq!(output.status.code(), Some(30));
    assert_eq!(lines(&output), vec!["s OPTIMAL", "o 3", "v -1 2 0"]);
}

#[test]
fn cnf_is_solved_as_maxsat() {
    let output = run_file("p cnf 2 3\n1 2 0\n-1 0\n-2 0\n", &["--max-steps", "-1"]);
    assert_eq!(output.status.code(), Some(30));
    let lines = lines(&output);
    assert_eq!(lines[0], "s OPTIMAL");
    assert_eq!(lines[1], "o 1");
}

#[test]
fn unsat_hards() {
    let output = run_file("p wcnf 1 3 5\n5 1 0\n5 -1 0\n1 1 0\n", &[]);
    assert_eq!(output.status.code(), Some(20));
    assert_eq!(lines(&output), vec!["s UNSATISFIABLE"]);
}

#[test]
fn zero_step_budget() {
    let output = run_file("p cnf 2 1\n1 2 0\n", &["--max-steps", "0"]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(lines(&output), vec!["s UNKNOWN"]);
}

#[test]
fn from_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_smax"))
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"p wcnf 2 3 4\n4 1 2 0\n1 -1 0\n1 -2 0\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(30));
    assert_eq!(lines(&output)[..2], ["s OPTIMAL", "o 1"]);
}

#[test]
fn malformed_input() {
    let output = run_file("1 2 0\n", &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error"));
}

#[test]
fn memory_limit() {
    let output = run_file(
        "p wcnf 2 4 10\n10 -1 -2 0\n3 1 0\n4 2 0\n0 1 2 0\n",
        &["--mem-lim", "4096"],
    );
    assert_eq!(output.status.code(), Some(30));
    assert_eq!(lines(&output), vec!["s OPTIMAL", "o 3", "v -1 2 0"]);
    assert!(!String::from_utf8_lossy(&output.stdout).contains("WARNING"));
}

#[test]
fn memory_limit_rejects_garbage() {
    let output = run_file("p cnf 1 1\n1 0\n", &["--mem-lim", "lots"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cost_line_only_for_optimum() {
    // at most one of x1..x6, each variable wants to be true
    let mut data = String::from("p wcnf 6 21 100\n");
    for a in 1..=6 {
        for b in a + 1..=6 {
            data.push_str(&format!("100 -{a} -{b} 0\n"));
        }
    }
    for var in 1..=6 {
        data.push_str(&format!("{var} {var} 0\n"));
    }
    for steps in [0, 1, 2, 4, 8, 16, 32, -1] {
        let output = run_file(&data, &["--max-steps", &steps.to_string()]);
        let lines = lines(&output);
        match lines[0].as_str() {
            "s OPTIMAL" => {
                assert_eq!(lines[1], "o 15");
                assert!(lines[2].starts_with("v "));
            }
            "s SATISFIABLE" => assert!(lines[1].starts_with("v "), "{lines:?}"),
            "s UNKNOWN" => assert_eq!(lines.len(), 1),
            other => panic!("unexpected {other} with budget {steps}"),
        }
        if steps < 0 {
            assert_eq!(lines[0], "s OPTIMAL");
        }
    }
}
