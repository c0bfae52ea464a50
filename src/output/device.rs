use crate::device::Device;
use crate::output::TableFormat;
use crate::types::ForwardEntry;

impl TableFormat for Device {
    fn headers() -> Vec<&'static str> {
        vec!["SERIAL", "MODEL", "PRODUCT", "USB", "TRANSPORT"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.serial().to_string(),
            self.model().unwrap_or_default().to_string(),
            self.product().unwrap_or_default().to_string(),
            self.usb().unwrap_or_default().to_string(),
            self.transport_id().unwrap_or_default().to_string(),
        ]
    }
}

impl TableFormat for ForwardEntry {
    fn headers() -> Vec<&'static str> {
        vec!["SERIAL", "LOCAL", "REMOTE"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.serial.to_string(),
            self.local.clone(),
            self.remote.clone(),
        ]
    }
}
