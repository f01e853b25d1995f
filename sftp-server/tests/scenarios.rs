//! End-to-end byte-level scenarios driven directly against an in-process
//! [`sftp_server::Subsystem`], with no real SSH transport involved, the
//! channel bytes a `russh` session would carry are fed in and read back by
//! hand, the same way `sftp-server`'s own inline unit tests do it, just from
//! outside the crate.

use std::sync::Arc;
use std::time::Duration;

use sftp_server::{AuditSink, Subsystem, UserAccount};

const OP_OPEN: u8 = 3;
const OP_CLOSE: u8 = 4;
const OP_WRITE: u8 = 6;
const OP_OPENDIR: u8 = 11;
const OP_READDIR: u8 = 12;
const OP_REALPATH: u8 = 16;

const RESP_STATUS: u8 = 101;
const RESP_HANDLE: u8 = 102;
const RESP_NAME: u8 = 104;

fn framed(opcode: u8, id: u32, body: &[u8]) -> Vec<u8> {
    let mut payload = vec![opcode];
    payload.extend_from_slice(&id.to_be_bytes());
    payload.extend_from_slice(body);
    let mut frame = (payload.len() as u32).to_be_bytes().to_vec();
    frame.extend_from_slice(&payload);
    frame
}

fn wire_string(s: &str) -> Vec<u8> {
    let mut out = (s.len() as u32).to_be_bytes().to_vec();
    out.extend_from_slice(s.as_bytes());
    out
}

fn init_frame() -> Vec<u8> {
    let mut frame = 5u32.to_be_bytes().to_vec();
    frame.push(1); // OP_INIT
    frame.extend_from_slice(&3u32.to_be_bytes());
    frame
}

fn response_type(frame: &[u8]) -> u8 {
    frame[4]
}

fn response_id(frame: &[u8]) -> u32 {
    u32::from_be_bytes(frame[5..9].try_into().unwrap())
}

fn handle_bytes(frame: &[u8]) -> Vec<u8> {
    assert_eq!(response_type(frame), RESP_HANDLE);
    let len = u32::from_be_bytes(frame[9..13].try_into().unwrap()) as usize;
    frame[13..13 + len].to_vec()
}

fn account(home: std::path::PathBuf) -> UserAccount {
    UserAccount {
        username: "alice".into(),
        home_directory: home,
        enabled: true,
        can_upload: true,
        can_download: true,
        can_delete: true,
        can_create_directory: true,
        max_upload_bytes: 0,
    }
}

async fn subsystem(
    root: std::path::PathBuf,
    user: UserAccount,
    max_upload_bytes: u64,
    idle_timeout: Option<Duration>,
) -> Subsystem {
    let (audit, _join) = AuditSink::spawn(Vec::<u8>::new());
    Subsystem::new(root, user, "integration".into(), max_upload_bytes, idle_timeout, Arc::new(audit))
        .await
        .unwrap()
}

#[tokio::test]
async fn handshake_negotiates_version_3() {
    let dir = tempfile::tempdir().unwrap();
    let mut sys = subsystem(dir.path().to_path_buf(), account(dir.path().to_path_buf()), 0, None).await;

    let responses = sys.on_data(&init_frame()).await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].as_ref(), [0x00, 0x00, 0x00, 0x05, 0x02, 0x00, 0x00, 0x00, 0x03]);
}

#[tokio::test]
async fn realpath_of_root_reports_the_jail_root_itself() {
    let dir = tempfile::tempdir().unwrap();
    let mut sys = subsystem(dir.path().to_path_buf(), account(dir.path().to_path_buf()), 0, None).await;

    let request = framed(OP_REALPATH, 7, &wire_string("/.."));
    let responses = sys.on_data(&request).await;
    assert_eq!(responses.len(), 1);
    assert_eq!(response_type(&responses[0]), RESP_NAME);
    assert_eq!(response_id(&responses[0]), 7);

    let mut cursor = &responses[0][13..];
    let name_len = u32::from_be_bytes(cursor[0..4].try_into().unwrap()) as usize;
    cursor = &cursor[4..];
    assert_eq!(&cursor[..name_len], b"/");
}

#[tokio::test]
async fn opendir_readdir_and_close_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("one.txt"), b"hello").unwrap();
    std::fs::write(dir.path().join("two.txt"), b"world").unwrap();
    let mut sys = subsystem(dir.path().to_path_buf(), account(dir.path().to_path_buf()), 0, None).await;

    let opendir = framed(OP_OPENDIR, 1, &wire_string("/"));
    let responses = sys.on_data(&opendir).await;
    let handle = handle_bytes(&responses[0]);

    let mut readdir_body = (handle.len() as u32).to_be_bytes().to_vec();
    readdir_body.extend_from_slice(&handle);
    let readdir = framed(OP_READDIR, 2, &readdir_body);
    let responses = sys.on_data(&readdir).await;
    assert_eq!(responses.len(), 1);
    assert_eq!(response_type(&responses[0]), RESP_NAME);
    let count = u32::from_be_bytes(responses[0][9..13].try_into().unwrap());
    assert_eq!(count, 2);

    let mut close_body = Vec::new();
    close_body.extend_from_slice(&(handle.len() as u32).to_be_bytes());
    close_body.extend_from_slice(&handle);
    let close = framed(OP_CLOSE, 3, &close_body);
    let responses = sys.on_data(&close).await;
    assert_eq!(response_type(&responses[0]), RESP_STATUS);
}

#[tokio::test]
async fn write_past_the_upload_ceiling_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut sys = subsystem(dir.path().to_path_buf(), account(dir.path().to_path_buf()), 4, None).await;

    let mut open_body = wire_string("/big.txt");
    open_body.extend_from_slice(&0x1Au32.to_be_bytes()); // write | create | truncate
    open_body.extend_from_slice(&0u32.to_be_bytes()); // empty Attrs flags
    let responses = sys.on_data(&framed(OP_OPEN, 1, &open_body)).await;
    let handle = handle_bytes(&responses[0]);

    let mut write_body = Vec::new();
    write_body.extend_from_slice(&(handle.len() as u32).to_be_bytes());
    write_body.extend_from_slice(&handle);
    write_body.extend_from_slice(&0u64.to_be_bytes()); // offset
    write_body.extend_from_slice(&(10u32).to_be_bytes()); // data length
    write_body.extend_from_slice(b"0123456789");
    let responses = sys.on_data(&framed(OP_WRITE, 2, &write_body)).await;

    assert_eq!(response_type(&responses[0]), RESP_STATUS);
    assert_ne!(responses[0][9..13], [0, 0, 0, 0]); // not SSH_FX_OK
}

#[tokio::test]
async fn path_traversal_above_root_is_clamped() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("visible")).unwrap();
    let mut sys = subsystem(dir.path().to_path_buf(), account(dir.path().to_path_buf()), 0, None).await;

    // Enough leading ".." to walk back past the jail root itself: per §4.2
    // steps 3-4 / §8, this clamps to the root rather than landing on some
    // sibling path outside it.
    let request = framed(OP_REALPATH, 4, &wire_string("/../../../../etc/visible"));
    let responses = sys.on_data(&request).await;
    assert_eq!(response_type(&responses[0]), RESP_NAME);

    let mut cursor = &responses[0][13..];
    let name_len = u32::from_be_bytes(cursor[0..4].try_into().unwrap()) as usize;
    cursor = &cursor[4..];
    assert_eq!(&cursor[..name_len], b"/");
}

#[tokio::test]
async fn download_without_permission_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("secret.txt"), b"top secret").unwrap();
    let mut user = account(dir.path().to_path_buf());
    user.can_download = false;
    let mut sys = subsystem(dir.path().to_path_buf(), user, 0, None).await;

    let mut open_body = wire_string("/secret.txt");
    open_body.extend_from_slice(&0x01u32.to_be_bytes()); // read
    open_body.extend_from_slice(&0u32.to_be_bytes());
    let responses = sys.on_data(&framed(OP_OPEN, 1, &open_body)).await;
    assert_eq!(response_type(&responses[0]), RESP_STATUS);
}

#[tokio::test]
async fn idle_channel_is_reported_expired_after_its_window() {
    let dir = tempfile::tempdir().unwrap();
    let mut sys = subsystem(
        dir.path().to_path_buf(),
        account(dir.path().to_path_buf()),
        0,
        Some(Duration::from_millis(10)),
    )
    .await;

    sys.on_data(&init_frame()).await;
    tokio::time::sleep(Duration::from_millis(25)).await;
    assert!(sys.is_expired(std::time::Instant::now()));
}
