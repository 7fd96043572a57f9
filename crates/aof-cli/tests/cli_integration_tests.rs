// AOF Compactor - Streaming append-only log compaction
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CLI integration tests for aofcompact

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::NamedTempFile;

const FULL_LOG: &str = "5\nkey1 1\nkey2 2\nkey3 3\nkey4 6\nkey5 10\n\
                        CREATE  key1 1000\nMODIFY  key1 +1\nCREATE  key2 2000\n\
                        CREATE  key3 3000\nCREATE  key4 4000\nSET     key4 4500\n\
                        DELETE  key4\nCREATE key5 5000\nMODIFY  key5 +1\n\
                        MODIFY  key5 +1\nMODIFY  key5 -1\n";

const FULL_COMPACTED: &str =
    "CREATE key1 1001\nCREATE key2 2000\nCREATE key3 3000\nDELETE key4\nCREATE key5 5001\n";

// Test helper to create an aofcompact command
fn aof_cmd() -> Command {
    Command::cargo_bin("aofcompact").expect("Failed to find aofcompact binary")
}

// Test helper to create a temporary log file
fn create_temp_file(content: &str) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".aof")
        .tempfile()
        .expect("Failed to create temp file");
    fs::write(file.path(), content).expect("Failed to write temp file");
    file
}

// ===== Help and Version Tests =====

#[test]
fn test_help_output() {
    aof_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("--check"));
}

#[test]
fn test_version_output() {
    aof_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("aofcompact"));
}

// ===== Compaction Tests =====

#[test]
fn test_compact_file() {
    let file = create_temp_file(FULL_LOG);

    aof_cmd()
        .arg(file.path())
        .assert()
        .success()
        .stdout(FULL_COMPACTED);
}

#[test]
fn test_compact_piped_stdin() {
    aof_cmd()
        .write_stdin(FULL_LOG)
        .assert()
        .success()
        .stdout(FULL_COMPACTED);
}

#[test]
fn test_compact_dash_reads_stdin() {
    aof_cmd()
        .arg("-")
        .write_stdin("1\nkeyX 2\nCREATE keyX 1\nDELETE keyX\nCREATE keyX 1000\n")
        .assert()
        .success()
        .stdout("CREATE keyX 1000\n");
}

#[test]
fn test_file_argument_wins_over_stdin() {
    let file = create_temp_file("1\nfrom_file 0\nCREATE from_file 1\n");

    aof_cmd()
        .arg(file.path())
        .write_stdin("1\nfrom_stdin 0\nCREATE from_stdin 1\n")
        .assert()
        .success()
        .stdout("CREATE from_file 1\n");
}

#[test]
fn test_empty_header() {
    aof_cmd().write_stdin("0\n").assert().success().stdout("");
}

#[test]
fn test_check_mode() {
    let file = create_temp_file(FULL_LOG);

    aof_cmd()
        .arg("--check")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_small_buffer() {
    aof_cmd()
        .args(["--buffer-size", "1"])
        .write_stdin(FULL_LOG)
        .assert()
        .success()
        .stdout(FULL_COMPACTED);
}

// ===== Error Tests =====

#[test]
fn test_missing_file() {
    aof_cmd()
        .arg("/nonexistent/mutations.aof")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "Cannot open '/nonexistent/mutations.aof' file",
        ));
}

#[test]
fn test_unknown_action() {
    aof_cmd()
        .write_stdin("1\nkey1 0\nACTION X Y Z\n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Cannot parse input: error at line 3: unknown action: ACTION",
        ));
}

#[test]
fn test_empty_input() {
    aof_cmd()
        .write_stdin("")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error at line 1"));
}

#[test]
fn test_partial_output_before_error() {
    aof_cmd()
        .write_stdin("2\na 0\nb 1\nCREATE a 5\nDELETE b\n")
        .assert()
        .code(2)
        .stdout("CREATE a 5\n")
        .stderr(predicate::str::contains("key 'b' was not created"));
}

#[test]
fn test_premature_end() {
    aof_cmd()
        .write_stdin("1\nkeyX 10\nCREATE keyX 1")
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "error at line 4: unexpected end of input, expected at least 10 line(s)",
        ));
}

#[test]
fn test_token_too_long() {
    aof_cmd()
        .args(["--max-token-length", "4"])
        .write_stdin("1\nlongkey 0\nCREATE longkey 1\n")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("scan failure: token exceeds maximum length of 4 bytes"));
}

#[test]
fn test_invalid_buffer_size_argument() {
    aof_cmd()
        .args(["--buffer-size", "lots"])
        .assert()
        .code(255)
        .stderr(predicate::str::contains("invalid value"));
}
