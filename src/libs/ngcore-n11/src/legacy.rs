//! S6a update-location pass-through
//!
//! The AMF reaches the legacy HSS path through the N11 client; the request is
//! handed unchanged to whichever S6a handler the process registered.

use crate::proto::RatType;
use crate::types::Imsi;

/// Update Location Request as handed to the S6a layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S6aUpdateLocationReq {
    pub imsi: Imsi,
    pub initial_attach: bool,
    pub skip_subscriber_data: bool,
    /// Visited PLMN identity, 3 octets BCD
    pub visited_plmn: Vec<u8>,
    pub rat_type: RatType,
}

/// Sink for update-location requests
pub trait S6aUpdateLocation: Send + Sync {
    /// Returns whether the request was accepted for sending
    fn s6a_update_location_req(&self, req: &S6aUpdateLocationReq) -> bool;
}

impl<F> S6aUpdateLocation for F
where
    F: Fn(&S6aUpdateLocationReq) -> bool + Send + Sync,
{
    fn s6a_update_location_req(&self, req: &S6aUpdateLocationReq) -> bool {
        self(req)
    }
}
