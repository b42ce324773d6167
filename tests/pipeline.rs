use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::Path,
    time::{Duration, Instant},
};

use nix::sys::{
    signal::{kill, Signal},
    wait::waitpid,
};
use pipesh::{parse_tokens, process::ExitStatus, Outcome, ParsedCommand, ShellContext};
use pretty_assertions::assert_eq;

fn command(tokens: &[&str]) -> ParsedCommand {
    parse_tokens(tokens).unwrap()
}

fn path(p: &Path) -> &str {
    p.to_str().unwrap()
}

async fn run(tokens: &[&str]) -> Outcome {
    let mut ctx = ShellContext::from_env().unwrap();
    command(tokens).execute(&mut ctx).await.unwrap()
}

fn exit_codes(outcome: &Outcome) -> Vec<Option<i32>> {
    match outcome {
        Outcome::Completed(statuses) => statuses
            .iter()
            .map(|stage| stage.status.and_then(|status| status.code()))
            .collect(),
        other => panic!("expected a completed pipeline, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_command_spawns_nothing() {
    assert_eq!(run(&[]).await, Outcome::Empty);
}

#[tokio::test]
async fn single_stage_receives_arguments_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let outcome = run(&["printf", "%s|", "a", "b c", "--d", ">", path(&out)]).await;

    assert_eq!(exit_codes(&outcome), [Some(0)]);
    assert_eq!(fs::read_to_string(&out).unwrap(), "a|b c|--d|");
}

#[tokio::test]
async fn pipe_preserves_binary_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.bin");
    let out = dir.path().join("out.bin");

    // larger than a pipe buffer so the stages have to interleave
    let data: Vec<u8> = (0..300_000u32).map(|i| (i * 7 % 256) as u8).collect();
    fs::write(&input, &data).unwrap();

    let outcome = run(&["cat", "<", path(&input), "|", "cat", ">", path(&out)]).await;

    assert_eq!(exit_codes(&outcome), [Some(0), Some(0)]);
    assert!(fs::read(&out).unwrap() == data);
}

#[tokio::test]
async fn three_stage_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let outcome = run(&[
        "printf", "b\\na\\nc\\n", "|", "sort", "|", "tr", "a-z", "A-Z", ">", path(&out),
    ])
    .await;

    assert_eq!(exit_codes(&outcome), [Some(0), Some(0), Some(0)]);
    assert_eq!(fs::read_to_string(&out).unwrap(), "A\nB\nC\n");
}

#[tokio::test]
async fn input_redirect_feeds_file_contents() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let out = dir.path().join("out");
    fs::write(&input, "hello pipes\n").unwrap();

    run(&["tr", "a-z", "A-Z", "<", path(&input), ">", path(&out)]).await;

    assert_eq!(fs::read_to_string(&out).unwrap(), "HELLO PIPES\n");
}

#[tokio::test]
async fn output_redirect_truncates_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    fs::write(&out, "a much longer previous content\n").unwrap();

    run(&["printf", "hi", ">", path(&out)]).await;

    assert_eq!(fs::read_to_string(&out).unwrap(), "hi");
}

#[tokio::test]
async fn output_file_is_created_without_exec_bits() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("created");

    run(&["true", ">", path(&out)]).await;

    let mode = fs::metadata(&out).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode & 0o600, 0o600);
    assert_eq!(mode & 0o111, 0);
    assert_eq!(mode & 0o022, 0);
}

#[tokio::test]
async fn exec_failure_is_confined_to_its_stage() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let outcome = run(&[
        "pipesh-no-such-program",
        "|",
        "printf",
        "still ran",
        ">",
        path(&out),
    ])
    .await;

    assert_eq!(exit_codes(&outcome), [Some(127), Some(0)]);
    assert_eq!(fs::read_to_string(&out).unwrap(), "still ran");
}

#[tokio::test]
async fn downstream_sees_eof_when_upstream_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let outcome = run(&["pipesh-no-such-program", "|", "wc", "-c", ">", path(&out)]).await;

    assert_eq!(exit_codes(&outcome), [Some(127), Some(0)]);
    assert_eq!(fs::read_to_string(&out).unwrap().trim(), "0");
}

#[tokio::test]
async fn missing_input_file_fails_the_child_only() {
    let outcome = run(&["cat", "<", "/pipesh/no/such/input"]).await;
    assert_eq!(exit_codes(&outcome), [Some(1)]);
}

#[tokio::test]
async fn exit_status_of_each_stage_is_collected() {
    let outcome = run(&["sh", "-c", "exit 4", "|", "sh", "-c", "exit 0"]).await;

    match &outcome {
        Outcome::Completed(statuses) => {
            assert_eq!(statuses.len(), 2);
            assert_eq!(statuses[0].status, Some(ExitStatus::Exited(4)));
            assert!(statuses[1].status.unwrap().success());
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn background_returns_without_waiting() {
    let started = Instant::now();
    let outcome = run(&["sleep", "5", "&"]).await;
    let elapsed = started.elapsed();

    let pid = match outcome {
        Outcome::Background(pid) => pid,
        other => panic!("expected background outcome, got {other:?}"),
    };
    assert!(elapsed < Duration::from_secs(2), "waited {elapsed:?}");

    kill(pid, Signal::SIGKILL).unwrap();
    waitpid(pid, None).unwrap();
}

#[tokio::test]
async fn background_redirect_eventually_writes() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");

    let outcome = run(&["echo", "hi", ">", path(&out), "&"]).await;

    let Outcome::Background(pid) = outcome else {
        panic!("expected background outcome, got {outcome:?}");
    };
    assert!(pid.as_raw() > 0);

    waitpid(pid, None).unwrap();
    assert_eq!(fs::read_to_string(&out).unwrap(), "hi\n");
}

#[tokio::test]
async fn background_pipeline_reports_its_leader() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let outcome = run(&["printf", "x", "|", "cat", ">", path(&out), "&"]).await;

    let Outcome::Background(leader) = outcome else {
        panic!("expected background outcome, got {outcome:?}");
    };
    waitpid(leader, None).unwrap();

    // the trailing stage is not tracked, so poll for its output
    let deadline = Instant::now() + Duration::from_secs(5);
    while fs::read_to_string(&out).unwrap_or_default() != "x" {
        assert!(Instant::now() < deadline, "background stage never finished");
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[tokio::test]
async fn writer_dies_of_sigpipe_when_reader_exits() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let outcome = run(&["yes", "|", "head", "-n", "1", ">", path(&out)]).await;

    match &outcome {
        Outcome::Completed(statuses) => {
            assert_eq!(statuses[0].status, Some(ExitStatus::Signaled(Signal::SIGPIPE)));
            assert_eq!(statuses[1].status, Some(ExitStatus::Exited(0)));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(fs::read_to_string(&out).unwrap(), "y\n");
}

#[tokio::test]
async fn writer_ignoring_write_errors_is_still_reaped() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        run(&[
            "sh",
            "-c",
            "while :; do echo y; done",
            "|",
            "head",
            "-n",
            "1",
            ">",
            path(&out),
        ]),
    )
    .await
    .expect("pipeline never finished");

    assert_eq!(exit_codes(&outcome), [None, Some(0)]);
    assert_eq!(fs::read_to_string(&out).unwrap(), "y\n");
}
