use serde::Serialize;

/// Operation identifier checked by the authorization gate.
///
/// Each exposed endpoint maps to exactly one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ListServices,
    CreateService,
    UpdateService,
    DeleteService,
    SubmitApplication,
    ListOwnApplications,
    ListAllApplications,
    ChangeApplicationStatus,
    Register,
    Login,
    ViewOwnProfile,
}

impl Operation {
    pub const ALL: [Operation; 11] = [
        Operation::ListServices,
        Operation::CreateService,
        Operation::UpdateService,
        Operation::DeleteService,
        Operation::SubmitApplication,
        Operation::ListOwnApplications,
        Operation::ListAllApplications,
        Operation::ChangeApplicationStatus,
        Operation::Register,
        Operation::Login,
        Operation::ViewOwnProfile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListServices => "services.list",
            Operation::CreateService => "services.create",
            Operation::UpdateService => "services.update",
            Operation::DeleteService => "services.delete",
            Operation::SubmitApplication => "applications.submit",
            Operation::ListOwnApplications => "applications.list_own",
            Operation::ListAllApplications => "applications.list_all",
            Operation::ChangeApplicationStatus => "applications.change_status",
            Operation::Register => "identity.register",
            Operation::Login => "identity.login",
            Operation::ViewOwnProfile => "identity.profile",
        }
    }

    /// Public operations are open to anonymous callers.
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            Operation::ListServices | Operation::Register | Operation::Login
        )
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
