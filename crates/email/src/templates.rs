//! Notification email templates.
//!
//! Bodies are rendered in Portuguese, the language of the applicants.
//! Tax identifiers must arrive here already masked; a raw CPF or CNPJ
//! must never reach a mailbox.

/// Registration confirmation, sent right after a successful submission.
pub struct RegistrationConfirmationEmail<'a> {
    pub name: &'a str,
    /// "CPF" or "CNPJ", matching the applicant's person type.
    pub tax_id_label: &'a str,
    /// Masked identifier, e.g. "123.***.***".
    pub masked_tax_id: &'a str,
}

impl RegistrationConfirmationEmail<'_> {
    /// Subject line for this notification.
    #[must_use]
    pub const fn subject(&self) -> &'static str {
        "Confirmação de Cadastro - Credenciamento"
    }

    /// Render the HTML version of the email.
    #[must_use]
    pub fn render_html(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="UTF-8">
    <title>Confirmação de Cadastro</title>
    <style>
        body {{
            font-family: Arial, Helvetica, sans-serif;
            line-height: 1.6;
            color: #333;
            max-width: 600px;
            margin: 0 auto;
            padding: 20px;
        }}
        .card {{
            background-color: #ffffff;
            border: 1px solid #e0e0e0;
            border-radius: 8px;
            padding: 32px;
        }}
        h1 {{
            color: #1a1a1a;
            font-size: 22px;
        }}
        .tax-id {{
            color: #666;
            font-size: 14px;
        }}
        .footer {{
            margin-top: 24px;
            padding-top: 16px;
            border-top: 1px solid #eee;
            font-size: 12px;
            color: #666;
        }}
    </style>
</head>
<body>
    <div class="card">
        <h1>Confirmação de Cadastro</h1>

        <p>Olá, {name},</p>

        <p>Seu cadastro foi realizado com sucesso em nosso sistema.</p>

        <p class="tax-id">{tax_id_label}: {masked_tax_id}</p>

        <p>Em breve nossa equipe fará a validação das informações e você
        receberá novas instruções por e-mail.</p>

        <div class="footer">
            <p>Atenciosamente,<br>Equipe de Credenciamento</p>
        </div>
    </div>
</body>
</html>"#,
            name = html_escape(self.name),
            tax_id_label = self.tax_id_label,
            masked_tax_id = self.masked_tax_id,
        )
    }

    /// Render the plain text version of the email.
    #[must_use]
    pub fn render_text(&self) -> String {
        format!(
            "Confirmação de Cadastro\n\
             \n\
             Olá, {name},\n\
             \n\
             Seu cadastro foi realizado com sucesso em nosso sistema.\n\
             \n\
             {tax_id_label}: {masked_tax_id}\n\
             \n\
             Em breve nossa equipe fará a validação das informações e você \
             receberá novas instruções por e-mail.\n\
             \n\
             Atenciosamente,\n\
             Equipe de Credenciamento",
            name = self.name,
            tax_id_label = self.tax_id_label,
            masked_tax_id = self.masked_tax_id,
        )
    }
}

/// Status update, sent when a reviewer changes a registration's status.
pub struct StatusUpdateEmail<'a> {
    pub name: &'a str,
    /// Human-readable status label, e.g. "Aprovado".
    pub status_label: &'a str,
    /// "CPF" or "CNPJ", matching the applicant's person type.
    pub tax_id_label: &'a str,
    /// Masked identifier, e.g. "123.***.***".
    pub masked_tax_id: &'a str,
    /// Adds a line asking the applicant to watch their inbox for the
    /// requested adjustments.
    pub adjustment_requested: bool,
}

impl StatusUpdateEmail<'_> {
    /// Subject line for this notification.
    #[must_use]
    pub fn subject(&self) -> String {
        format!("Atualização de Status - Credenciamento: {}", self.status_label)
    }

    /// Render the HTML version of the email.
    #[must_use]
    pub fn render_html(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
    <meta charset="UTF-8">
    <title>Atualização de Status</title>
    <style>
        body {{
            font-family: Arial, Helvetica, sans-serif;
            line-height: 1.6;
            color: #333;
            max-width: 600px;
            margin: 0 auto;
            padding: 20px;
        }}
        .card {{
            background-color: #ffffff;
            border: 1px solid #e0e0e0;
            border-radius: 8px;
            padding: 32px;
        }}
        h1 {{
            color: #1a1a1a;
            font-size: 22px;
        }}
        .tax-id {{
            color: #666;
            font-size: 14px;
        }}
        .footer {{
            margin-top: 24px;
            padding-top: 16px;
            border-top: 1px solid #eee;
            font-size: 12px;
            color: #666;
        }}
    </style>
</head>
<body>
    <div class="card">
        <h1>Atualização de Status</h1>

        <p>Olá, {name},</p>

        <p>O status do seu cadastro mudou para: <strong>{status_label}</strong>.</p>

        <p class="tax-id">{tax_id_label}: {masked_tax_id}</p>
{adjustment_note}
        <p>Em caso de dúvida, responda este e-mail para falar com a equipe
        de credenciamento.</p>

        <div class="footer">
            <p>Atenciosamente,<br>Equipe de Credenciamento</p>
        </div>
    </div>
</body>
</html>"#,
            name = html_escape(self.name),
            status_label = html_escape(self.status_label),
            tax_id_label = self.tax_id_label,
            masked_tax_id = self.masked_tax_id,
            adjustment_note = if self.adjustment_requested {
                "\n        <p>Nossa equipe enviará em breve as instruções com os \
                 ajustes necessários. Fique atento ao seu e-mail.</p>\n"
            } else {
                ""
            },
        )
    }

    /// Render the plain text version of the email.
    #[must_use]
    pub fn render_text(&self) -> String {
        format!(
            "Atualização de Status\n\
             \n\
             Olá, {name},\n\
             \n\
             O status do seu cadastro mudou para: {status_label}.\n\
             \n\
             {tax_id_label}: {masked_tax_id}\n\
             {adjustment_note}\
             \n\
             Em caso de dúvida, responda este e-mail para falar com a equipe \
             de credenciamento.\n\
             \n\
             Atenciosamente,\n\
             Equipe de Credenciamento",
            name = self.name,
            status_label = self.status_label,
            tax_id_label = self.tax_id_label,
            masked_tax_id = self.masked_tax_id,
            adjustment_note = if self.adjustment_requested {
                "\nNossa equipe enviará em breve as instruções com os ajustes \
                 necessários. Fique atento ao seu e-mail.\n"
            } else {
                ""
            },
        )
    }
}

/// Simple HTML escaping for template values.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
