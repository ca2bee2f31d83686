use std::fs;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::Shell;

// cli.rs depends on clap alone, so the build script can include it as-is.
#[path = "src/cli.rs"]
mod cli;

fn main() {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let Some(out_dir) = std::env::var_os("OUT_DIR") else {
        panic!("OUT_DIR not set by Cargo");
    };
    let out_dir = Path::new(&out_dir);

    let man_dir = out_dir.join("man");
    let completion_dir = out_dir.join("completions");
    for dir in [&man_dir, &completion_dir] {
        fs::create_dir_all(dir)
            .unwrap_or_else(|e| panic!("failed to create {}: {e}", dir.display()));
    }

    let mut cmd = cli::Cli::command();
    write_manpages(&cmd, "fabricctl", &man_dir);
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        clap_complete::generate_to(shell, &mut cmd, "fabricctl", &completion_dir)
            .unwrap_or_else(|e| panic!("failed to write {shell} completions: {e}"));
    }
}

/// One page per visible command, named `fabricctl-image-stage.1` and so on.
fn write_manpages(cmd: &clap::Command, name: &str, dir: &Path) {
    let page = cmd.clone().name(name.to_owned());
    let mut buf = Vec::new();
    clap_mangen::Man::new(page)
        .render(&mut buf)
        .unwrap_or_else(|e| panic!("failed to render man page for `{name}`: {e}"));
    let path = dir.join(format!("{name}.1"));
    fs::write(&path, buf).unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));

    for sub in cmd.get_subcommands().filter(|s| !s.is_hide_set()) {
        write_manpages(sub, &format!("{name}-{}", sub.get_name()), dir);
    }
}
