//! Fixture site shared by task and session tests.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::{tempdir, TempDir};

pub(crate) fn write(root: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

/// A small site that builds cleanly with the default layout.
pub(crate) fn site() -> TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();

    write(
        root,
        "src/views/pages/index.html",
        r#"<!DOCTYPE html>
<html lang="en">
@@include('../partials/head.html', {"title": "Home"})
<body>
  <h1>Welcome</h1>
  <img src="images/icon.svg" alt="">
  <!-- build:js scripts/app.js -->
  <script src="scripts/main.js"></script>
  <!-- endbuild -->
</body>
</html>
"#,
    );
    write(
        root,
        "src/views/partials/head.html",
        r#"<head>
  <meta charset="utf-8">
  <title>@@title</title>
  <!-- build:css styles/main.css -->
  <link rel="stylesheet" href="styles/main.css">
  <!-- endbuild -->
</head>"#,
    );
    write(
        root,
        "src/styles/main.scss",
        "@import 'base/base';\n$heading: #333;\nh1 { color: $heading; }\n",
    );
    write(root, "src/styles/base/_base.scss", "body { margin: 0; }\n");
    write(
        root,
        "src/scripts/main.js",
        "document.title = document.title + \"!\";\n",
    );
    write(
        root,
        "src/images/icon.svg",
        "<svg xmlns=\"http://www.w3.org/2000/svg\">\n  <!-- icon -->\n  <rect width=\"1\"/>\n</svg>\n",
    );
    write(root, "src/fonts/site.woff2", [0u8, 1, 2, 3]);

    temp
}
