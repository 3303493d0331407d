use std::{fs, process::Command, time::SystemTime};

fn main() {
  let now = SystemTime::now()
    .duration_since(std::time::UNIX_EPOCH)
    .unwrap()
    .as_millis();
  println!("cargo:rustc-env=BUILD_TIME={}", now);

  println!("cargo:rerun-if-changed=.git/HEAD");

  println!("cargo:rustc-env=GIT_COMMIT={}", git_commit());
}

fn git_commit() -> String {
  if let Ok(output) = Command::new("git").args(["rev-parse", "HEAD"]).output() {
    if output.status.success() {
      return String::from_utf8_lossy(&output.stdout).trim().to_string();
    }
  }

  // Fallback to manual parsing when git is unavailable
  if let Ok(head) = fs::read_to_string(".git/HEAD") {
    if let Some(ref_path) = head.strip_prefix("ref: ") {
      if let Ok(commit) = fs::read_to_string(format!(".git/{}", ref_path.trim())) {
        return commit.trim().to_string();
      }
    } else {
      return head.trim().to_string();
    }
  }

  "unknown".to_string()
}
