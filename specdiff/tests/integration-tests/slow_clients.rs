// Copyright 2026 Oxide Computer Company

//! Tests for clients that stall or go away partway through an upload.

use crate::common;
use crate::common::SpecDiffTestContext;
use specdiff::ServerContext;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

fn workspace_count(scratch: &TempDir) -> usize {
    std::fs::read_dir(scratch.path())
        .expect("failed to list scratch directory")
        .count()
}

/// Waits for the scratch directory to hold exactly `count` workspaces.
async fn wait_for_workspaces(scratch: &TempDir, count: usize) {
    for _ in 0..200 {
        if workspace_count(scratch) == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!(
        "expected {} workspaces, found {}",
        count,
        workspace_count(scratch)
    );
}

/// Connects to the server and sends the head of a POST that promises a
/// longer body than is sent.
async fn start_upload(
    testctx: &SpecDiffTestContext,
    path: &str,
    content_type: &str,
    partial_body: &str,
) -> TcpStream {
    let addr = testctx.server.local_addr();
    let mut stream =
        TcpStream::connect(addr).await.expect("failed to connect");
    let head = format!(
        "POST {} HTTP/1.1\r\n\
        Host: {}\r\n\
        Content-Type: {}\r\n\
        Content-Length: 100000\r\n\
        \r\n",
        path, addr, content_type
    );
    stream.write_all(head.as_bytes()).await.expect("failed to write head");
    stream
        .write_all(partial_body.as_bytes())
        .await
        .expect("failed to write body");
    stream.flush().await.expect("failed to flush");
    stream
}

#[tokio::test]
async fn test_disconnect_removes_workspace() {
    let scratch = common::scratch_dir();
    let testctx = common::test_setup("disconnect_removes_workspace", &scratch);

    let stream = start_upload(
        &testctx,
        "/diff",
        "multipart/form-data; boundary=specdiff-test-boundary",
        "--specdiff-test-boundary\r\n\
        Content-Disposition: form-data; name=\"base\"\r\n\
        \r\n\
        openapi: 3.0.3\n",
    )
    .await;

    // The base part is being staged while the rest of it is awaited.
    wait_for_workspaces(&scratch, 1).await;

    drop(stream);
    wait_for_workspaces(&scratch, 0).await;
    common::assert_no_workspaces(&scratch);
    testctx.teardown().await;
}

#[tokio::test]
async fn test_stalled_form_times_out() {
    let scratch = common::scratch_dir();
    let mut config = common::test_config(&scratch);
    config.upload.timeout_secs = 1;
    let context = ServerContext::new(&config).unwrap();
    let testctx =
        common::test_setup_with_context("stalled_form_times_out", context);

    let mut stream = start_upload(
        &testctx,
        "/diff",
        "application/x-www-form-urlencoded",
        "base=openapi",
    )
    .await;

    // The url-encoded body is never completed, so reading it must give up
    // once the time limit passes.
    let mut response = Vec::new();
    let mut buffer = [0u8; 1024];
    tokio::time::timeout(Duration::from_secs(10), async {
        while !response.windows(4).any(|window| window == b"\r\n\r\n") {
            let n = stream.read(&mut buffer).await.expect("read failed");
            if n == 0 {
                break;
            }
            response.extend_from_slice(&buffer[..n]);
        }
    })
    .await
    .expect("no response before the time limit");
    let response = String::from_utf8_lossy(&response);
    assert!(
        response.starts_with("HTTP/1.1 503"),
        "unexpected response: {}",
        response
    );

    common::assert_no_workspaces(&scratch);
    testctx.teardown().await;
}
