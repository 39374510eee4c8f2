use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output();

    let version = match output {
        Ok(o) if o.status.success() => {
            let git_output = String::from_utf8(o.stdout)
                .unwrap_or_default()
                .trim()
                .to_string();

            // "v1.2.3-4-gabc1234-dirty" -> "1.2.3"
            let version = git_output.strip_prefix('v').unwrap_or(&git_output);
            let version = version.split('-').next().unwrap_or_default();

            if version.starts_with(|c: char| c.is_ascii_digit()) && version.contains('.') {
                version.to_string()
            } else {
                // Untagged checkout: only a commit hash is available
                "0.0.0".to_string()
            }
        }
        _ => "0.0.0".to_string(),
    };

    println!("cargo:rustc-env=GHUP_VERSION={}", version);
}
