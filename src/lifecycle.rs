// src/lifecycle.rs
//
// The truck lifecycle state machine. Every handler that moves a truck
// between statuses goes through `transition` instead of branching on raw
// strings, so the set of legal moves lives in exactly one place.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Net weight above which a weighment needs supervisor approval (kg).
pub const NET_WEIGHT_APPROVAL_THRESHOLD: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TruckStatus {
    #[serde(rename = "scheduled")]
    Scheduled,
    #[serde(rename = "pending-approval")]
    PendingApproval,
    #[serde(rename = "rejected")]
    Rejected,
    #[serde(rename = "at_weighbridge")]
    AtWeighbridge,
    #[serde(rename = "at_parking")]
    AtParking,
    #[serde(rename = "at_dock")]
    AtDock,
    #[serde(rename = "loading_completed")]
    LoadingCompleted,
    #[serde(rename = "unloading_completed")]
    UnloadingCompleted,
    #[serde(rename = "exit_ready")]
    ExitReady,
    #[serde(rename = "exited")]
    Exited,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl TruckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TruckStatus::Scheduled => "scheduled",
            TruckStatus::PendingApproval => "pending-approval",
            TruckStatus::Rejected => "rejected",
            TruckStatus::AtWeighbridge => "at_weighbridge",
            TruckStatus::AtParking => "at_parking",
            TruckStatus::AtDock => "at_dock",
            TruckStatus::LoadingCompleted => "loading_completed",
            TruckStatus::UnloadingCompleted => "unloading_completed",
            TruckStatus::ExitReady => "exit_ready",
            TruckStatus::Exited => "exited",
            TruckStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses counted as "inside the park" for the KPI dashboard.
    pub fn is_inside(&self) -> bool {
        matches!(
            self,
            TruckStatus::AtWeighbridge
                | TruckStatus::AtParking
                | TruckStatus::AtDock
                | TruckStatus::LoadingCompleted
                | TruckStatus::UnloadingCompleted
                | TruckStatus::ExitReady
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TruckStatus::Rejected | TruckStatus::Exited)
    }
}

impl fmt::Display for TruckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TruckStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(TruckStatus::Scheduled),
            "pending-approval" => Ok(TruckStatus::PendingApproval),
            "rejected" => Ok(TruckStatus::Rejected),
            "at_weighbridge" => Ok(TruckStatus::AtWeighbridge),
            "at_parking" => Ok(TruckStatus::AtParking),
            "at_dock" => Ok(TruckStatus::AtDock),
            "loading_completed" => Ok(TruckStatus::LoadingCompleted),
            "unloading_completed" => Ok(TruckStatus::UnloadingCompleted),
            "exit_ready" => Ok(TruckStatus::ExitReady),
            "exited" => Ok(TruckStatus::Exited),
            "cancelled" => Ok(TruckStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown status value '{}'", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Where the gate guard sends a verified truck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YardLocation {
    Parking,
    Weighbridge,
    Dock,
}

impl YardLocation {
    pub fn status(&self) -> TruckStatus {
        match self {
            YardLocation::Parking => TruckStatus::AtParking,
            YardLocation::Weighbridge => TruckStatus::AtWeighbridge,
            YardLocation::Dock => TruckStatus::AtDock,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Loading,
    Unloading,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Loading => "loading",
            OperationKind::Unloading => "unloading",
        }
    }

    pub fn completed_status(&self) -> TruckStatus {
        match self {
            OperationKind::Loading => TruckStatus::LoadingCompleted,
            OperationKind::Unloading => TruckStatus::UnloadingCompleted,
        }
    }

    /// Whether a dock of the given type can host this operation.
    pub fn supported_by(&self, dock_type: &str) -> bool {
        dock_type == "both" || dock_type == self.as_str()
    }
}

/// Gate-guard checklist. Three checks are required for the normal verify
/// path; the last two are informational only.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateChecks {
    pub driver_identity_verified: bool,
    pub vehicle_number_matches: bool,
    pub documents_verified: bool,
    #[serde(default)]
    pub safety_equipment_ok: bool,
    #[serde(default)]
    pub vehicle_condition_ok: bool,
}

impl GateChecks {
    pub fn required_ok(&self) -> bool {
        self.driver_identity_verified && self.vehicle_number_matches && self.documents_verified
    }

    /// Names of the required checks that failed, for the approval request.
    pub fn failed_required(&self) -> Vec<&'static str> {
        let mut failed = Vec::new();
        if !self.driver_identity_verified {
            failed.push("driverIdentityVerified");
        }
        if !self.vehicle_number_matches {
            failed.push("vehicleNumberMatches");
        }
        if !self.documents_verified {
            failed.push("documentsVerified");
        }
        failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruckEvent {
    Verify { location: YardLocation },
    Reject,
    HoldForApproval,
    RouteToParking,
    RouteToDock,
    CallToDock,
    CompleteOperation { kind: OperationKind },
    MarkExitReady,
    Exit,
    Cancel,
    Reschedule,
}

impl TruckEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TruckEvent::Verify { .. } => "verify",
            TruckEvent::Reject => "reject",
            TruckEvent::HoldForApproval => "hold_for_approval",
            TruckEvent::RouteToParking => "route_to_parking",
            TruckEvent::RouteToDock => "route_to_dock",
            TruckEvent::CallToDock => "call_to_dock",
            TruckEvent::CompleteOperation { .. } => "complete_operation",
            TruckEvent::MarkExitReady => "mark_exit_ready",
            TruckEvent::Exit => "exit",
            TruckEvent::Cancel => "cancel",
            TruckEvent::Reschedule => "reschedule",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: TruckStatus,
    pub event: &'static str,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event '{}' is not allowed from status '{}'", self.event, self.from)
    }
}

/// The single transition function. Verification from `pending-approval`
/// additionally requires an approved exception, which the caller passes in
/// as the truck's current approval status.
pub fn transition(
    current: TruckStatus,
    event: TruckEvent,
    approval: Option<ApprovalStatus>,
) -> Result<TruckStatus, TransitionError> {
    use TruckEvent::*;
    use TruckStatus::*;

    let next = match (current, event) {
        (Scheduled, Verify { location }) => location.status(),
        (Scheduled, Reject) => Rejected,
        (Scheduled, HoldForApproval) => PendingApproval,
        (Scheduled, Cancel) => Cancelled,
        // Verify-with-exception: only once a supervisor has approved.
        (PendingApproval, Verify { location }) if approval == Some(ApprovalStatus::Approved) => {
            location.status()
        }
        (PendingApproval, Reject) => Rejected,
        // Routing off the weighbridge is reserved for the weighbridge flow,
        // which checks the entry milestone before firing these.
        (AtWeighbridge, RouteToParking) => AtParking,
        (AtWeighbridge, RouteToDock) => AtDock,
        // The dock screen can only call trucks that are already parked.
        (AtParking, CallToDock) => AtDock,
        (AtDock, CompleteOperation { kind }) => kind.completed_status(),
        (LoadingCompleted, MarkExitReady) => ExitReady,
        (UnloadingCompleted, MarkExitReady) => ExitReady,
        (ExitReady, Exit) => Exited,
        (Cancelled, Reschedule) => Scheduled,
        (from, event) => {
            return Err(TransitionError { from, event: event.name() })
        }
    };
    Ok(next)
}

/// Events currently legal for a truck, used by the gate lookup endpoint.
pub fn allowed_events(current: TruckStatus, approval: Option<ApprovalStatus>) -> Vec<&'static str> {
    if current.is_terminal() {
        return Vec::new();
    }
    const ALL: &[TruckEvent] = &[
        TruckEvent::Verify { location: YardLocation::Parking },
        TruckEvent::Reject,
        TruckEvent::HoldForApproval,
        TruckEvent::RouteToParking,
        TruckEvent::RouteToDock,
        TruckEvent::CallToDock,
        TruckEvent::CompleteOperation { kind: OperationKind::Loading },
        TruckEvent::MarkExitReady,
        TruckEvent::Exit,
        TruckEvent::Cancel,
        TruckEvent::Reschedule,
    ];
    ALL.iter()
        .filter(|e| transition(current, **e, approval).is_ok())
        .map(|e| e.name())
        .collect()
}

pub fn net_weight(gross: f64, tare: f64) -> f64 {
    gross - tare
}

/// Strictly greater than the threshold: a net of exactly 200 passes.
pub fn needs_weighment_approval(net: f64) -> bool {
    net.abs() > NET_WEIGHT_APPROVAL_THRESHOLD
}

/// Milestone on a weighbridge entry, mirrored into the truck status when
/// the entry is routed onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Milestone {
    PendingWeighing,
    Weighed,
    AtParking,
    AtDock,
}

impl Milestone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Milestone::PendingWeighing => "PENDING_WEIGHING",
            Milestone::Weighed => "WEIGHED",
            Milestone::AtParking => "AT_PARKING",
            Milestone::AtDock => "AT_DOCK",
        }
    }
}

impl FromStr for Milestone {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_WEIGHING" => Ok(Milestone::PendingWeighing),
            "WEIGHED" => Ok(Milestone::Weighed),
            "AT_PARKING" => Ok(Milestone::AtParking),
            "AT_DOCK" => Ok(Milestone::AtDock),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verify_to(location: YardLocation) -> TruckEvent {
        TruckEvent::Verify { location }
    }

    #[test]
    fn scheduled_truck_verifies_into_location_status() {
        assert_eq!(
            transition(TruckStatus::Scheduled, verify_to(YardLocation::Parking), None),
            Ok(TruckStatus::AtParking)
        );
        assert_eq!(
            transition(TruckStatus::Scheduled, verify_to(YardLocation::Weighbridge), None),
            Ok(TruckStatus::AtWeighbridge)
        );
        assert_eq!(
            transition(TruckStatus::Scheduled, verify_to(YardLocation::Dock), None),
            Ok(TruckStatus::AtDock)
        );
    }

    #[test]
    fn pending_approval_verifies_only_with_approved_exception() {
        let event = verify_to(YardLocation::Weighbridge);
        assert!(transition(TruckStatus::PendingApproval, event, None).is_err());
        assert!(
            transition(TruckStatus::PendingApproval, event, Some(ApprovalStatus::Pending)).is_err()
        );
        assert!(
            transition(TruckStatus::PendingApproval, event, Some(ApprovalStatus::Rejected))
                .is_err()
        );
        assert_eq!(
            transition(TruckStatus::PendingApproval, event, Some(ApprovalStatus::Approved)),
            Ok(TruckStatus::AtWeighbridge)
        );
    }

    #[test]
    fn terminal_states_accept_no_events() {
        for terminal in [TruckStatus::Rejected, TruckStatus::Exited] {
            assert!(terminal.is_terminal());
            assert!(allowed_events(terminal, Some(ApprovalStatus::Approved)).is_empty());
        }
        // Cancelled is not terminal: it can still be rescheduled.
        assert!(!TruckStatus::Cancelled.is_terminal());
        assert!(!TruckStatus::AtDock.is_terminal());
    }

    #[test]
    fn full_loading_path() {
        let mut status = TruckStatus::Scheduled;
        let steps = [
            verify_to(YardLocation::Weighbridge),
            TruckEvent::RouteToDock,
            TruckEvent::CompleteOperation { kind: OperationKind::Loading },
            TruckEvent::MarkExitReady,
            TruckEvent::Exit,
        ];
        for event in steps {
            status = transition(status, event, None).unwrap();
        }
        assert_eq!(status, TruckStatus::Exited);
    }

    #[test]
    fn unloading_completes_to_unloading_completed() {
        assert_eq!(
            transition(
                TruckStatus::AtDock,
                TruckEvent::CompleteOperation { kind: OperationKind::Unloading },
                None
            ),
            Ok(TruckStatus::UnloadingCompleted)
        );
    }

    #[test]
    fn parked_truck_can_be_called_to_dock() {
        assert_eq!(
            transition(TruckStatus::AtParking, TruckEvent::CallToDock, None),
            Ok(TruckStatus::AtDock)
        );
    }

    #[test]
    fn dock_call_cannot_pull_truck_off_weighbridge() {
        // A truck still at the weighbridge (possibly held for a weighment
        // exception) leaves it only through the weighbridge routing, which
        // guards on the entry milestone. The dock screen's call event is
        // not valid there.
        assert!(transition(TruckStatus::AtWeighbridge, TruckEvent::CallToDock, None).is_err());
        assert!(transition(TruckStatus::Scheduled, TruckEvent::CallToDock, None).is_err());
        // Conversely the weighbridge routing events are not valid from
        // parking or the dock.
        assert!(transition(TruckStatus::AtParking, TruckEvent::RouteToDock, None).is_err());
        assert!(transition(TruckStatus::AtDock, TruckEvent::RouteToParking, None).is_err());
    }

    #[test]
    fn operation_kind_respects_dock_type() {
        assert!(OperationKind::Loading.supported_by("both"));
        assert!(OperationKind::Loading.supported_by("loading"));
        assert!(!OperationKind::Loading.supported_by("unloading"));
        assert!(OperationKind::Unloading.supported_by("unloading"));
        assert!(!OperationKind::Unloading.supported_by("loading"));
    }

    #[test]
    fn cancel_only_from_scheduled() {
        assert_eq!(
            transition(TruckStatus::Scheduled, TruckEvent::Cancel, None),
            Ok(TruckStatus::Cancelled)
        );
        assert!(transition(TruckStatus::AtParking, TruckEvent::Cancel, None).is_err());
        assert!(transition(TruckStatus::Exited, TruckEvent::Cancel, None).is_err());
    }

    #[test]
    fn reschedule_returns_cancelled_truck_to_scheduled() {
        assert_eq!(
            transition(TruckStatus::Cancelled, TruckEvent::Reschedule, None),
            Ok(TruckStatus::Scheduled)
        );
        assert!(transition(TruckStatus::Rejected, TruckEvent::Reschedule, None).is_err());
    }

    #[test]
    fn transition_error_names_the_pair() {
        let err = transition(TruckStatus::Exited, TruckEvent::Exit, None).unwrap_err();
        assert_eq!(err.from, TruckStatus::Exited);
        assert_eq!(err.event, "exit");
    }

    #[test]
    fn status_strings_round_trip() {
        let all = [
            TruckStatus::Scheduled,
            TruckStatus::PendingApproval,
            TruckStatus::Rejected,
            TruckStatus::AtWeighbridge,
            TruckStatus::AtParking,
            TruckStatus::AtDock,
            TruckStatus::LoadingCompleted,
            TruckStatus::UnloadingCompleted,
            TruckStatus::ExitReady,
            TruckStatus::Exited,
            TruckStatus::Cancelled,
        ];
        for status in all {
            assert_eq!(status.as_str().parse::<TruckStatus>().unwrap(), status);
        }
        assert_eq!("pending-approval".parse::<TruckStatus>().unwrap(), TruckStatus::PendingApproval);
        assert!("inside-plant".parse::<TruckStatus>().is_err());
        assert!("arrived".parse::<TruckStatus>().is_err());
    }

    #[test]
    fn required_checks_gate_verification() {
        let all_ok = GateChecks {
            driver_identity_verified: true,
            vehicle_number_matches: true,
            documents_verified: true,
            safety_equipment_ok: false,
            vehicle_condition_ok: false,
        };
        assert!(all_ok.required_ok());

        let docs_unchecked = GateChecks { documents_verified: false, ..all_ok };
        assert!(!docs_unchecked.required_ok());
        assert_eq!(docs_unchecked.failed_required(), vec!["documentsVerified"]);
    }

    #[test]
    fn net_weight_threshold_is_strictly_greater() {
        assert_eq!(net_weight(10200.0, 10000.0), 200.0);
        assert!(!needs_weighment_approval(net_weight(10200.0, 10000.0)));
        assert_eq!(net_weight(10201.0, 10000.0), 201.0);
        assert!(needs_weighment_approval(net_weight(10201.0, 10000.0)));
        // Magnitude, not sign: a negative delta past the threshold is held too.
        assert!(needs_weighment_approval(-201.0));
        assert!(!needs_weighment_approval(-200.0));
    }

    #[test]
    fn milestone_strings_round_trip() {
        for m in [
            Milestone::PendingWeighing,
            Milestone::Weighed,
            Milestone::AtParking,
            Milestone::AtDock,
        ] {
            assert_eq!(m.as_str().parse::<Milestone>().unwrap(), m);
        }
    }

    #[test]
    fn allowed_events_for_scheduled() {
        let events = allowed_events(TruckStatus::Scheduled, None);
        assert!(events.contains(&"verify"));
        assert!(events.contains(&"reject"));
        assert!(events.contains(&"hold_for_approval"));
        assert!(events.contains(&"cancel"));
        assert!(!events.contains(&"exit"));
    }
}
