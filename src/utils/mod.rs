use std::time::SystemTime;

use x509_cert::{certificate::CertificateInner, crl::CertificateList};

pub mod crypto;
pub mod cursor;
pub mod json;

pub trait Expireable {
    fn valid_at(&self, timestamp: SystemTime) -> bool;
}

impl Expireable for CertificateList {
    /// `thisUpdate <= timestamp <= nextUpdate`; a CRL without `nextUpdate` never expires.
    fn valid_at(&self, timestamp: SystemTime) -> bool {
        if let Some(na) = self.tbs_cert_list.next_update.map(|t| t.to_system_time()) {
            if timestamp > na {
                return false;
            }
        }

        // the crl is for the future
        let nb = self.tbs_cert_list.this_update.to_system_time();
        if timestamp < nb {
            return false;
        }

        true
    }
}

impl Expireable for CertificateInner {
    /// Validate a single certificate not_before/not_after, both inclusive.
    fn valid_at(&self, timestamp: SystemTime) -> bool {
        let nb = self.tbs_certificate.validity.not_before.to_system_time();
        let na = self.tbs_certificate.validity.not_after.to_system_time();
        nb <= timestamp && timestamp <= na
    }
}

impl<T: Expireable> Expireable for [T] {
    fn valid_at(&self, timestamp: SystemTime) -> bool {
        self.iter().all(|item| item.valid_at(timestamp))
    }
}

impl<T: Expireable + ?Sized> Expireable for &T {
    fn valid_at(&self, timestamp: SystemTime) -> bool {
        (**self).valid_at(timestamp)
    }
}
