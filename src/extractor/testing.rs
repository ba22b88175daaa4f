//! Shell scripts that accept the unzip and 7-Zip argument layouts and
//! behave like a real extractor would for a handful of archive shapes.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy)]
pub enum FakeBehaviour {
    /// Writes `a.txt` and `dir/b.txt`, prints a listing on stdout
    TwoFiles,
    /// Writes nothing, warns `zipfile is empty` on stderr and exits 1
    Empty,
    /// Prints `corrupt archive` on stderr and exits 9
    Fail,
    /// Never finishes on its own
    Hang,
    /// Prints a line of output, then never finishes
    Stall,
    /// Behaves like `Fail` for archives named `broken*`, like `TwoFiles` otherwise
    FailOnBroken,
}

const PARSE_DESTINATION: &str = r#"dest=""
while [ $# -gt 0 ]; do
  case "$1" in
    -d) dest="$2"; shift 2 ;;
    -o) shift ;;
    -o*) dest="${1#-o}"; shift ;;
    -*) shift ;;
    *) archive="$1"; shift ;;
  esac
done
"#;

pub fn fake_extractor(dir: &Path, behaviour: FakeBehaviour) -> PathBuf {
    let body = match behaviour {
        FakeBehaviour::TwoFiles => {
            "mkdir -p \"$dest/dir\"\nprintf 'alpha\\n' > \"$dest/a.txt\"\nprintf 'bravo\\n' > \"$dest/dir/b.txt\"\necho \"inflating: a.txt\"\necho \"inflating: dir/b.txt\"\n"
        }
        FakeBehaviour::Empty => "echo \"zipfile is empty\" >&2\nexit 1\n",
        FakeBehaviour::Fail => "echo \"corrupt archive\" >&2\nexit 9\n",
        FakeBehaviour::Hang => "exec sleep 30\n",
        FakeBehaviour::Stall => "echo \"Extracting archive: slow.7z\"\nexec sleep 30\n",
        FakeBehaviour::FailOnBroken => concat!(
            "case \"$(basename \"$archive\")\" in\n",
            "  broken*) echo \"corrupt archive\" >&2; exit 9 ;;\n",
            "esac\n",
            "mkdir -p \"$dest/dir\"\nprintf 'alpha\\n' > \"$dest/a.txt\"\nprintf 'bravo\\n' > \"$dest/dir/b.txt\"\n",
        ),
    };

    let path = dir.join(format!("fake-extractor-{:?}", behaviour).to_lowercase());
    fs::write(&path, format!("#!/bin/sh\n{}{}", PARSE_DESTINATION, body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}
