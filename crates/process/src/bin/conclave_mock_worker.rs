// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mock worker backend (spec.md §4.6a): reads one line of kickoff JSON from
//! stdin and immediately reports it back as an IPC result frame. Stands in
//! for a real agent backend in tests and local development.

use conclave_process::ipc::{IpcFrame, IpcResultData};
use serde::Deserialize;
use std::io::{self, BufRead, Write};

#[derive(Debug, Deserialize, Default)]
struct Kickoff {
    #[serde(default)]
    content: String,
}

fn main() {
    let stdin = io::stdin();
    let mut line = String::new();
    let _ = stdin.lock().read_line(&mut line);

    let kickoff: Kickoff = serde_json::from_str(line.trim()).unwrap_or_default();
    let frame = IpcFrame::Result {
        data: IpcResultData {
            content: kickoff.content,
        },
    };

    let Ok(encoded) = serde_json::to_string(&frame) else {
        return;
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let _ = writeln!(out, "{encoded}");
}
