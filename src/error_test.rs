//! Tests for error types

#[cfg(test)]
mod tests {
    use crate::error::{AdbError, ExitStatus, StdStream};

    #[test]
    fn test_remote_failure_display() {
        let err = AdbError::CommandFailed("device offline".to_string());
        assert_eq!(format!("{}", err), "command failed: device offline");

        let err = AdbError::SyncFailed("No such file or directory".to_string());
        assert!(format!("{}", err).contains("No such file"));
    }

    #[test]
    fn test_exit_errors_display() {
        let err = AdbError::Exit(ExitStatus::new(7));
        assert!(format!("{}", err).contains('7'));
        assert_eq!(err.exit_status().map(|s| s.code()), Some(7));

        let err = AdbError::ExitMissing;
        assert!(format!("{}", err).contains("without exit status"));
        assert!(err.exit_status().is_none());
    }

    #[test]
    fn test_configuration_errors_name_the_stream() {
        let err = AdbError::StreamAlreadySet(StdStream::Stdout);
        assert!(format!("{}", err).contains("stdout"));

        let err = AdbError::PipeAfterStart(StdStream::Stdin);
        assert!(format!("{}", err).contains("stdin"));
    }

    #[test]
    fn test_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err: AdbError = io_err.into();
        assert!(format!("{}", err).contains("ADB connection error"));
        assert!(err.is_connection_fault());
        assert!(!AdbError::CommandFailed("x".into()).is_connection_fault());
    }

    #[test]
    fn test_join_keeps_both_errors() {
        assert!(AdbError::join(Ok(()), Ok(())).is_ok());

        let only_teardown = AdbError::join(Ok(()), Err(AdbError::ConnectionBroken));
        assert!(matches!(only_teardown, Err(AdbError::ConnectionBroken)));

        let both = AdbError::join(
            Err(AdbError::Exit(ExitStatus::new(2))),
            Err(AdbError::ConnectionBroken),
        )
        .unwrap_err();
        match &both {
            AdbError::Joined(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected Joined, got {:?}", other),
        }
        let message = both.to_string();
        assert!(message.contains("unexpected exit code 2"));
        assert!(message.contains("socket connection broken"));
        assert_eq!(both.exit_status().map(|s| s.code()), Some(2));
    }
}
