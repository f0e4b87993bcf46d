//! Agent/server HTTP wire types.
//!
//! Requests and responses are grouped by caller: the agent endpoints, the
//! owner (dashboard) endpoints, and the wipe/browse sub-protocol.

mod agent;
mod owner;
mod wipe;

pub use agent::{
    ActionResultReport, DeviceInfoResponse, DeviceSnapshot, LocationFix, MessageAckRequest,
    RegisterRequest, RegisterResponse, ReportResponse, StatusReport,
};
pub use owner::{
    ClearAlarmRequest, LinkRequest, LinkResponse, SetGeofenceRequest, TriggerActionRequest,
    TriggerActionResponse,
};
pub use wipe::{
    ApprovedFolderList, ApprovedFolderSync, ApprovedFolderSyncResponse, BrowseListing,
    BrowseRequestBody, BrowseRequestCreated, BrowseResultReport, PendingBrowseResponse,
    PendingWipeResponse, WipeOperationView, WipeProgressReport, WipeStatusResponse,
    WipeTriggerRequest, WipeTriggerResponse,
};
