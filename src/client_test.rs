use crate::client::Client;
use crate::error::AdbError;
use crate::testing::{fixtures, MockServer};

async fn client_with_server() -> (Client, MockServer) {
    let server = MockServer::bind().await;
    (Client::new(server.config()), server)
}

#[tokio::test]
async fn test_server_version_parses_hex() {
    let (client, server) = client_with_server().await;
    let peer = tokio::spawn(async move {
        let mut peer = server.accept().await;
        assert_eq!(peer.expect_command().await, "host:version");
        peer.reply(&fixtures::okay_with("0029")).await;
        peer.read_to_end().await;
    });

    assert_eq!(client.server_version().await.unwrap(), 41);
    peer.await.unwrap();
}

#[tokio::test]
async fn test_server_version_rejects_garbage() {
    let (client, server) = client_with_server().await;
    let peer = tokio::spawn(async move {
        let mut peer = server.accept().await;
        peer.expect_command().await;
        peer.reply(&fixtures::okay_with("zz")).await;
        peer.read_to_end().await;
    });

    assert!(matches!(
        client.server_version().await,
        Err(AdbError::Parse(_))
    ));
    peer.await.unwrap();
}

#[tokio::test]
async fn test_device_serial_list_skips_short_lines() {
    let (client, server) = client_with_server().await;
    let peer = tokio::spawn(async move {
        let mut peer = server.accept().await;
        assert_eq!(peer.expect_command().await, "host:devices");
        peer.reply(&fixtures::okay_with(
            "emulator-5554\tdevice\nabc123\toffline\n\n",
        ))
        .await;
        peer.read_to_end().await;
    });

    let serials = client.device_serial_list().await.unwrap();
    let serials: Vec<&str> = serials.iter().map(|s| s.as_str()).collect();
    assert_eq!(serials, vec!["emulator-5554", "abc123"]);
    peer.await.unwrap();
}

#[tokio::test]
async fn test_device_list_parses_attributes() {
    let (client, server) = client_with_server().await;
    let peer = tokio::spawn(async move {
        let mut peer = server.accept().await;
        assert_eq!(peer.expect_command().await, "host:devices-l");
        peer.reply(&fixtures::okay_with(fixtures::devices_long_output()))
            .await;
        peer.read_to_end().await;
    });

    let devices = client.device_list().await.unwrap();
    assert_eq!(devices.len(), 2);

    assert_eq!(devices[0].serial().as_str(), "emulator-5554");
    assert_eq!(devices[0].model(), Some("sdk_gphone64"));
    assert!(!devices[0].is_usb());

    assert_eq!(devices[1].serial().as_str(), "0123456789ABCDEF");
    assert_eq!(devices[1].usb(), Some("1-1"));
    assert_eq!(devices[1].transport_id(), Some("2"));
    assert!(devices[1].is_usb());
    peer.await.unwrap();
}

#[tokio::test]
async fn test_fail_reply_surfaces_server_message() {
    let (client, server) = client_with_server().await;
    let peer = tokio::spawn(async move {
        let mut peer = server.accept().await;
        peer.expect_command().await;
        peer.reply(&fixtures::fail("unknown host service")).await;
        peer.read_to_end().await;
    });

    let err = client.execute_command("host:bogus", false).await.unwrap_err();
    assert!(matches!(err, AdbError::CommandFailed(ref msg) if msg == "unknown host service"));
    peer.await.unwrap();
}

#[tokio::test]
async fn test_kill_server_does_not_wait_for_reply() {
    let (client, server) = client_with_server().await;
    let peer = tokio::spawn(async move {
        let mut peer = server.accept().await;
        assert_eq!(peer.expect_command().await, "host:kill");
        peer.read_to_end().await;
    });

    client.kill_server().await.unwrap();
    peer.await.unwrap();
}

#[tokio::test]
async fn test_connect_checks_reply_text() {
    let (client, server) = client_with_server().await;
    let peer = tokio::spawn(async move {
        let mut peer = server.accept().await;
        assert_eq!(
            peer.expect_command().await,
            "host:connect:192.168.1.10:5555"
        );
        peer.reply(&fixtures::okay_with("connected to 192.168.1.10:5555"))
            .await;
        peer.read_to_end().await;

        let mut peer = server.accept().await;
        peer.expect_command().await;
        peer.reply(&fixtures::okay_with(
            "failed to connect to '192.168.1.11:5555': Connection refused",
        ))
        .await;
        peer.read_to_end().await;
    });

    let reply = client.connect("192.168.1.10", 5555).await.unwrap();
    assert!(reply.starts_with("connected to"));
    assert!(matches!(
        client.connect("192.168.1.11", 5555).await,
        Err(AdbError::CommandFailed(_))
    ));
    peer.await.unwrap();
}

#[tokio::test]
async fn test_forward_list() {
    let (client, server) = client_with_server().await;
    let peer = tokio::spawn(async move {
        let mut peer = server.accept().await;
        assert_eq!(peer.expect_command().await, "host:list-forward");
        peer.reply(&fixtures::okay_with(
            "abc123 tcp:8080 tcp:80\nemulator-5554 tcp:9000 localabstract:foo\n",
        ))
        .await;
        peer.read_to_end().await;
    });

    let forwards = client.forward_list().await.unwrap();
    assert_eq!(forwards.len(), 2);
    assert_eq!(forwards[1].remote, "localabstract:foo");
    peer.await.unwrap();
}

#[tokio::test]
async fn test_unreachable_server() {
    let server = MockServer::bind().await;
    let config = server.config();
    drop(server);

    let err = Client::new(config).server_version().await.unwrap_err();
    assert!(matches!(err, AdbError::Connect { .. }));
    assert!(err.is_connection_fault());
}

#[tokio::test]
async fn test_forward_kill_all_reads_status_only() {
    let (client, server) = client_with_server().await;
    let peer = tokio::spawn(async move {
        let mut peer = server.accept().await;
        assert_eq!(peer.expect_command().await, "host:killforward-all");
        peer.reply(&fixtures::okay()).await;
        peer.read_to_end().await;

        let mut peer = server.accept().await;
        peer.expect_command().await;
        peer.reply(&fixtures::fail("cannot remove listeners")).await;
        peer.read_to_end().await;
    });

    client.forward_kill_all().await.unwrap();
    assert!(matches!(
        client.forward_kill_all().await,
        Err(AdbError::CommandFailed(ref msg)) if msg == "cannot remove listeners"
    ));
    peer.await.unwrap();
}

#[tokio::test]
async fn test_disconnect_all_checks_reply_text() {
    let (client, server) = client_with_server().await;
    let peer = tokio::spawn(async move {
        let mut peer = server.accept().await;
        assert_eq!(peer.expect_command().await, "host:disconnect:");
        peer.reply(&fixtures::okay_with("disconnected everything"))
            .await;
        peer.read_to_end().await;

        let mut peer = server.accept().await;
        peer.expect_command().await;
        peer.reply(&fixtures::okay_with("error: no devices")).await;
        peer.read_to_end().await;
    });

    assert_eq!(
        client.disconnect_all().await.unwrap(),
        "disconnected everything"
    );
    assert!(matches!(
        client.disconnect_all().await,
        Err(AdbError::CommandFailed(_))
    ));
    peer.await.unwrap();
}
