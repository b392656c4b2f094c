use crate::api::{
    IdList,
    absences::{AbsenceListResponse, AbsenceView, CreateAbsence},
    dashboard::DashboardView,
    feedback::{CreateFeedback, FeedbackView},
    materials::MaterialReq,
    orders::{CreateOrder, OrderItemReq, OrderListResponse, OrderSummary, StatusReq},
    time_records::{
        Location, PunchReq, TimeRecordListResponse, TimeRecordReq, TimeRecordView, TodayView,
    },
    users::{CreateUser, UpdateUser, UserListResponse, UserView},
    vacations::{BookVacation, CalendarEvent},
};
use crate::model::{
    absence::Absence, feedback::Feedback, material::Material, order::OrderStatus,
    order_line::OrderLine, role::Role,
};
use crate::models::{FaceDescriptorReq, LoginReqDto, PinLoginReq, TokenPair};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "SIGHR API",
        version = "1.0.0",
        description = r#"
## SIGHR

Back end of a small-company HR app used by **collaborators** and **admins**.

### Key Features
- **Time clock**: clock-in, lunch-out, lunch-in and clock-out with optional GPS coordinates
- **Absences**: partial-day absences with a reason
- **Vacations**: calendar of booked days, individual and company-wide bookings, yearly credit
- **Material orders**: orders of free-text materials with status tracking
- **Feedback**: bug reports and suggestions
- **Users**: admin managed accounts with PIN and facial sign-in

### Security
`/auth/*` endpoints are public and rate limited. Everything under `/api` needs a
**JWT Bearer** access token; `/api/admin/*` additionally needs the Admin role.
"#,
    ),
    paths(
        crate::api::health::healthcheck,

        crate::auth::handlers::login,
        crate::auth::handlers::pin_login,
        crate::auth::handlers::admin_pin_login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::face::verify_face,
        crate::auth::face::register_profile,
        crate::auth::face::delete_profile,

        crate::api::dashboard::dashboard,

        crate::api::time_records::today,
        crate::api::time_records::clock_in,
        crate::api::time_records::lunch_out,
        crate::api::time_records::lunch_in,
        crate::api::time_records::clock_out,
        crate::api::time_records::my_records,
        crate::api::time_records::admin_list,
        crate::api::time_records::admin_get,
        crate::api::time_records::admin_create,
        crate::api::time_records::admin_update,
        crate::api::time_records::admin_delete,

        crate::api::absences::create_absence,
        crate::api::absences::my_absences,
        crate::api::absences::admin_list,
        crate::api::absences::admin_delete_many,

        crate::api::vacations::events,
        crate::api::vacations::remaining,
        crate::api::vacations::book,
        crate::api::vacations::book_company,

        crate::api::orders::create_order,
        crate::api::orders::my_orders,
        crate::api::orders::admin_list,
        crate::api::orders::admin_delete_many,
        crate::api::orders::admin_set_status,

        crate::api::materials::list_materials,
        crate::api::materials::get_material,
        crate::api::materials::create_material,
        crate::api::materials::update_material,
        crate::api::materials::delete_material,

        crate::api::order_lines::list_lines,
        crate::api::order_lines::get_line,
        crate::api::order_lines::create_line,
        crate::api::order_lines::update_line,
        crate::api::order_lines::delete_line,

        crate::api::feedback::create_feedback,
        crate::api::feedback::my_feedback,
        crate::api::feedback::admin_list,

        crate::api::users::list_users,
        crate::api::users::get_user,
        crate::api::users::create_user,
        crate::api::users::update_user,
        crate::api::users::delete_user
    ),
    components(
        schemas(
            LoginReqDto,
            PinLoginReq,
            FaceDescriptorReq,
            TokenPair,
            Role,
            DashboardView,
            PunchReq,
            Location,
            TodayView,
            TimeRecordView,
            TimeRecordListResponse,
            TimeRecordReq,
            Absence,
            CreateAbsence,
            AbsenceView,
            AbsenceListResponse,
            IdList,
            CalendarEvent,
            BookVacation,
            OrderStatus,
            OrderItemReq,
            CreateOrder,
            OrderSummary,
            OrderListResponse,
            StatusReq,
            Material,
            MaterialReq,
            OrderLine,
            Feedback,
            CreateFeedback,
            FeedbackView,
            UserView,
            UserListResponse,
            CreateUser,
            UpdateUser
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Uptime monitoring"),
        (name = "Auth", description = "Sign-in and token refresh"),
        (name = "Face", description = "Facial profile enrolment"),
        (name = "Dashboard", description = "Collaborator landing page"),
        (name = "Time records", description = "Daily time clock"),
        (name = "Absences", description = "Partial-day absences"),
        (name = "Vacations", description = "Vacation calendar and balances"),
        (name = "Orders", description = "Material orders"),
        (name = "Materials", description = "Material catalog"),
        (name = "Order lines", description = "Order line maintenance"),
        (name = "Feedback", description = "Bug reports and suggestions"),
        (name = "Users", description = "Account administration"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/auth/login"));
        assert!(doc.paths.paths.contains_key("/healthcheck"));
        assert!(doc.paths.paths.contains_key("/api/admin/users/{id}"));
        assert!(doc.paths.paths.contains_key("/api/collaborator/dashboard"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
