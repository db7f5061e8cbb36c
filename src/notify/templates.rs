use crate::model::{leave_request::LeaveRequest, user::Account};

pub fn approval_letter(applicant: &Account, request: &LeaveRequest, leave_type: &str) -> String {
    let approved_on = request
        .ceo_approval_date
        .map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_default();

    format!(
        r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Leave Approval Letter</title>
    <style>
        body {{
            font-family: Arial, sans-serif;
            line-height: 1.6;
            color: #333;
            max-width: 600px;
            margin: 0 auto;
            padding: 20px;
        }}
        .header {{
            background-color: #198754;
            padding: 20px;
            text-align: center;
            border-radius: 8px 8px 0 0;
            color: white;
        }}
        .content {{
            background-color: #ffffff;
            padding: 30px;
            border: 1px solid #e9ecef;
        }}
        table {{
            width: 100%;
            border-collapse: collapse;
        }}
        td {{
            padding: 6px 0;
        }}
    </style>
</head>
<body>
    <div class="header">
        <h1>Leave Approval Letter</h1>
    </div>
    <div class="content">
        <p>Dear {name},</p>
        <p>Your leave request has been approved at every level.</p>
        <table>
            <tr><td><strong>Employee ID</strong></td><td>{employee_id}</td></tr>
            <tr><td><strong>Leave type</strong></td><td>{leave_type}</td></tr>
            <tr><td><strong>From</strong></td><td>{start}</td></tr>
            <tr><td><strong>To</strong></td><td>{end}</td></tr>
            <tr><td><strong>Days</strong></td><td>{days}</td></tr>
            <tr><td><strong>Approved on</strong></td><td>{approved_on}</td></tr>
        </table>
        <p>Please hand over any pending work before your leave begins.</p>
    </div>
</body>
</html>
"#,
        name = applicant.user.full_name(),
        employee_id = applicant.profile.employee_id,
        leave_type = leave_type,
        start = request.start_date,
        end = request.end_date,
        days = request.total_days(),
        approved_on = approved_on,
    )
}

pub fn password_reset_text(reset_url: &str) -> String {
    format!("Click the link to reset your password: {reset_url}\n\nThe link expires in one hour.")
}
