mod common;

use common::TestContext;
use predicates::prelude::*;
use std::fs;

#[test]
fn init_creates_a_loadable_profile() {
    let ctx = TestContext::new();

    ctx.cli()
        .args(["init", "laura_vigne"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created profile"));

    let profile = ctx.profile_path("laura_vigne");
    assert!(profile.join("laura_vigne_comfyworkflow.json").is_file());
    for platform in ["meta", "fanvue"] {
        let inputs = profile.join(platform).join("inputs");
        assert!(inputs.join("laura_vigne.json").is_file());
        assert!(inputs.join("initial_conditions.md").is_file());
        assert!(profile.join(platform).join("outputs").is_dir());
    }
}

#[test]
fn init_refuses_existing_profile() {
    let ctx = TestContext::new();

    ctx.cli().args(["init", "laura_vigne"]).assert().success();
    ctx.cli()
        .args(["init", "laura_vigne"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn init_rejects_invalid_profile_name() {
    let ctx = TestContext::new();

    ctx.cli()
        .args(["init", "NotSnakeCase"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("snake_case"));
}

#[test]
fn plan_fails_without_resources() {
    let ctx = TestContext::new();

    ctx.cli()
        .args(["plan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Resources directory not found"));
}

#[test]
fn plan_fails_without_llm_credentials() {
    let ctx = TestContext::new();
    ctx.cli().args(["init", "laura_vigne"]).assert().success();

    ctx.cli()
        .args(["plan", "laura_vigne"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No LLM credentials"));
}

#[test]
fn plan_fails_for_unknown_profile() {
    let ctx = TestContext::new();
    ctx.cli().args(["init", "laura_vigne"]).assert().success();

    ctx.cli()
        .args(["plan", "nadia_reyes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn generate_fails_when_comfy_is_unreachable() {
    let ctx = TestContext::new();
    ctx.cli().args(["init", "laura_vigne"]).assert().success();
    // nothing listens on a reserved low port
    ctx.write_config("[endpoints]\ncomfy = \"http://127.0.0.1:1/\"\n");

    ctx.cli()
        .args(["generate", "laura_vigne"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ComfyUI"));
}

#[test]
fn publish_dry_run_lists_due_days_without_credentials() {
    let ctx = TestContext::new();
    ctx.cli().args(["init", "laura_vigne"]).assert().success();
    ctx.write_day_folder(
        "laura_vigne",
        "meta",
        "week_1",
        "day_1",
        "Hello from the island\n#story",
        "2020-01-01T10:00:00",
    );

    ctx.cli()
        .args(["publish", "laura_vigne", "--platform", "meta", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would publish"))
        .stdout(predicate::str::contains("1 published"));

    // a dry run records nothing
    let ledger = ctx
        .profile_path("laura_vigne")
        .join("meta/outputs/publications/published.toml");
    assert!(!ledger.exists());
}

#[test]
fn publish_dry_run_flags_not_yet_due_days() {
    let ctx = TestContext::new();
    ctx.cli().args(["init", "laura_vigne"]).assert().success();
    ctx.write_day_folder(
        "laura_vigne",
        "meta",
        "week_1",
        "day_1",
        "Saving this one for later",
        "2099-01-01T10:00:00",
    );

    ctx.cli()
        .args(["publish", "laura_vigne", "--platform", "meta", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("due in"))
        .stdout(predicate::str::contains("would publish"));
}

#[test]
fn publish_skips_incomplete_day_folders() {
    let ctx = TestContext::new();
    ctx.cli().args(["init", "laura_vigne"]).assert().success();
    let day = ctx.write_day_folder(
        "laura_vigne",
        "meta",
        "week_1",
        "day_1",
        "caption",
        "2020-01-01T10:00:00",
    );
    fs::remove_file(day.join("captions.txt")).unwrap();

    ctx.cli()
        .args(["publish", "laura_vigne", "--platform", "meta", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 skipped"))
        .stderr(predicate::str::contains("incomplete publication"));
}

#[test]
fn publish_without_generated_tree_warns_and_succeeds() {
    let ctx = TestContext::new();
    ctx.cli().args(["init", "laura_vigne"]).assert().success();

    ctx.cli()
        .args(["publish", "laura_vigne", "--dry-run"])
        .assert()
        .success()
        .stderr(predicate::str::contains("no publications yet"));
}

#[test]
fn publish_rejects_unknown_platform() {
    let ctx = TestContext::new();
    ctx.cli().args(["init", "laura_vigne"]).assert().success();

    ctx.cli()
        .args(["publish", "laura_vigne", "--platform", "tiktok", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown platform"));
}

#[test]
fn doctor_reports_missing_credentials() {
    let ctx = TestContext::new();
    ctx.cli().args(["init", "laura_vigne"]).assert().success();

    ctx.cli()
        .args(["doctor"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("valid profile"))
        .stderr(predicate::str::contains("issue(s) found"));
}

#[test]
fn doctor_passes_with_credentials_set() {
    let ctx = TestContext::new();
    ctx.cli().args(["init", "laura_vigne"]).assert().success();

    ctx.cli()
        .args(["doctor"])
        .env("OPENAI_API_KEY", "test-key")
        .env("META_ACCESS_TOKEN", "t")
        .env("META_USER_ID", "1")
        .env("IMG_HIPPO_API_KEY", "h")
        .env("FANVUE_API_KEY", "f")
        .assert()
        .success()
        .stdout(predicate::str::contains("All checks passed"));
}

#[test]
fn malformed_config_file_is_reported() {
    let ctx = TestContext::new();
    ctx.write_config("resources_path = 42\n");

    ctx.cli()
        .args(["plan"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TOML parse error"));
}
