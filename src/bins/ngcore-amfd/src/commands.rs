//! Subcommand handlers

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, ValueEnum};
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use ngcore_n11::proto::{BitrateUnitsAmbr, NotifyUeEvent, PduSessionType, RequestType, SmSessionFsmState};
use ngcore_n11::{
    create_sm_notification, create_sm_pdu_session, AsyncSmfServiceClient, Ambr, Apn,
    HttpSmfChannel, Imsi, N11Config, PduSessionParams, RpcStatus, SmNotificationParams, SmfRequest,
    SESSIOND_SERVICE,
};
use ngcore_ngap::{decode_ngap_pdu, Recovery};

/// Human-readable outline of one decoded PDU
pub fn decode_hex(input: &str) -> Result<String> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let mut raw = hex::decode(&cleaned).map_err(|e| anyhow::anyhow!("Invalid hex input: {}", e))?;
    if raw.is_empty() {
        return Err(anyhow::anyhow!("Empty NGAP buffer"));
    }

    let decoded = decode_ngap_pdu(&mut raw)?;
    let message = decoded.pdu.message();
    let ies: Vec<String> = message.value.ie_ids().iter().map(|id| id.0.to_string()).collect();

    let mut out = format!(
        "{} procedureCode={} criticality={:?} ies=[{}]",
        decoded.pdu.kind(),
        message.procedure_code,
        message.criticality,
        ies.join(",")
    );
    if let Recovery::Patched { offsets } = &decoded.recovery {
        out.push_str(&format!(" patched={:?} buffer={}", offsets, hex::encode(&raw)));
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SessionTypeArg {
    Ipv4,
    Ipv6,
    Ipv4v6,
    Unstructured,
}

impl From<SessionTypeArg> for PduSessionType {
    fn from(arg: SessionTypeArg) -> Self {
        match arg {
            SessionTypeArg::Ipv4 => PduSessionType::Ipv4,
            SessionTypeArg::Ipv6 => PduSessionType::Ipv6,
            SessionTypeArg::Ipv4v6 => PduSessionType::Ipv4Ipv6,
            SessionTypeArg::Unstructured => PduSessionType::Unstructured,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum EventArg {
    PduSessionInactive,
    IdleMode,
    ServiceRequestOnPaging,
    PeriodicRegUpdate,
    PduSessionState,
}

impl From<EventArg> for NotifyUeEvent {
    fn from(arg: EventArg) -> Self {
        match arg {
            EventArg::PduSessionInactive => NotifyUeEvent::PduSessionInactiveNotify,
            EventArg::IdleMode => NotifyUeEvent::UeIdleModeNotify,
            EventArg::ServiceRequestOnPaging => NotifyUeEvent::UeServiceRequestOnPaging,
            EventArg::PeriodicRegUpdate => NotifyUeEvent::UePeriodicRegUpdate,
            EventArg::PduSessionState => NotifyUeEvent::PduSessionStateNotify,
        }
    }
}

/// `create-session` arguments
#[derive(Args, Debug, Clone)]
pub struct CreateSessionArgs {
    /// Subscriber IMSI digits
    #[arg(long)]
    pub imsi: String,
    #[arg(long, default_value = "internet")]
    pub apn: String,
    #[arg(long, default_value_t = 1)]
    pub pdu_session_id: u32,
    #[arg(long, value_enum, default_value = "ipv4")]
    pub session_type: SessionTypeArg,
    /// gNB GTP-U TEID
    #[arg(long, default_value_t = 1)]
    pub teid: u32,
    /// gNB GTP-U address
    #[arg(long, default_value = "127.0.0.1")]
    pub gnb_addr: Ipv4Addr,
    #[arg(long, default_value_t = 1)]
    pub pti: u8,
    #[arg(long, default_value = "")]
    pub ue_ipv4: String,
    #[arg(long, default_value = "")]
    pub ue_ipv6: String,
    /// Session version counter
    #[arg(long = "session-version", default_value_t = 0)]
    pub version: u32,
    /// Session AMBR uplink, kbps
    #[arg(long, default_value_t = 100_000)]
    pub ambr_ul: u32,
    /// Session AMBR downlink, kbps
    #[arg(long, default_value_t = 100_000)]
    pub ambr_dl: u32,
    #[arg(long, default_value_t = 9)]
    pub qci: u8,
    #[arg(long, default_value_t = 1)]
    pub priority_level: u8,
    /// Print the request instead of sending it
    #[arg(long)]
    pub dry_run: bool,
}

impl CreateSessionArgs {
    pub fn to_params(&self) -> Result<PduSessionParams> {
        let mut params = PduSessionParams::new(Imsi::new(self.imsi.as_str())?, Apn::from(self.apn.as_str()), self.pdu_session_id);
        params.pdu_session_type = self.session_type.into();
        params.gnb_gtp_teid = self.teid;
        params.pti = self.pti;
        params.gnb_gtp_teid_ip_addr = self.gnb_addr.octets();
        params.ue_ipv4 = self.ue_ipv4.clone();
        params.ue_ipv6 = self.ue_ipv6.clone();
        params.version = self.version;
        params.state_ambr = Ambr {
            br_ul: self.ambr_ul,
            br_dl: self.ambr_dl,
            br_unit: BitrateUnitsAmbr::Kbps,
        };
        params.qos_profile.qci = self.qci;
        params.qos_profile.arp.priority_level = self.priority_level;
        Ok(params)
    }
}

/// `notify` arguments
#[derive(Args, Debug, Clone)]
pub struct NotifyArgs {
    #[arg(long)]
    pub imsi: String,
    #[arg(long, default_value = "internet")]
    pub apn: String,
    #[arg(long, default_value_t = 1)]
    pub pdu_session_id: u32,
    #[arg(long, value_enum)]
    pub event: EventArg,
    /// Session version counter
    #[arg(long = "session-version", default_value_t = 0)]
    pub version: u32,
    #[arg(long)]
    pub dry_run: bool,
}

impl NotifyArgs {
    pub fn to_params(&self) -> Result<SmNotificationParams> {
        Ok(SmNotificationParams {
            imsi: Imsi::new(self.imsi.as_str())?,
            apn: Apn::from(self.apn.as_str()),
            pdu_session_id: self.pdu_session_id,
            request_type: RequestType::ExistingPduSession,
            sm_session_state: SmSessionFsmState::Active2,
            version: self.version,
            event: self.event.into(),
        })
    }
}

/// Send one request to sessiond and wait for its callback
pub async fn send_and_wait(config: &N11Config, request: SmfRequest) -> Result<RpcStatus> {
    let channel = HttpSmfChannel::for_service(&config.services, SESSIOND_SERVICE, Handle::current())?;
    let client = AsyncSmfServiceClient::start(Arc::new(channel), config)?;

    let interrupted = Arc::clone(&client);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        interrupted.shutdown();
    })?;

    let (tx, rx) = oneshot::channel();
    let method = request.method();
    client.submit(
        request,
        move |status, _response| {
            let _ = tx.send(status);
        },
        config.response_timeout(),
    );

    // the client reports the deadline itself; this only guards a stuck loop
    let grace = config.response_timeout() + Duration::from_secs(1);
    let status = tokio::time::timeout(grace, rx)
        .await
        .map_err(|_| anyhow::anyhow!("No completion for {} within {:?}", method, grace))?
        .map_err(|_| anyhow::anyhow!("Completion for {} was dropped", method))?;

    client.shutdown();
    Ok(status)
}

pub fn session_request(args: &CreateSessionArgs) -> Result<SmfRequest> {
    Ok(create_sm_pdu_session(&args.to_params()?).into())
}

pub fn notification_request(args: &NotifyArgs) -> Result<SmfRequest> {
    Ok(create_sm_notification(&args.to_params()?).into())
}
