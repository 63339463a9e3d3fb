//! Localized display strings
//!
//! Every user-facing string the harness prints lives in a [`Strings`] table.
//! Templates use `{name}` placeholders filled in with [`fill`].

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English
    #[default]
    En,
    /// Portuguese (Brazil)
    Pt,
}

impl Locale {
    pub fn strings(self) -> &'static Strings {
        match self {
            Locale::En => &EN,
            Locale::Pt => &PT,
        }
    }
}

/// Display text for one locale
#[derive(Debug)]
pub struct Strings {
    pub suite_title: &'static str,
    pub starting_server: &'static str,
    pub waiting_for_server: &'static str,
    pub server_ready: &'static str,
    /// Placeholder: `{secs}`
    pub server_timeout: &'static str,
    /// Placeholder: `{error}`
    pub server_start_failed: &'static str,
    /// Placeholder: `{error}`
    pub browser_setup_failed: &'static str,
    pub environment_failed: &'static str,

    pub summary_title: &'static str,
    pub total_label: &'static str,
    pub passed_label: &'static str,
    pub failed_label: &'static str,
    pub success_rate_label: &'static str,
    pub all_passed: &'static str,
    pub some_failed: &'static str,

    pub check_api_health: &'static str,
    pub check_main_page: &'static str,
    pub check_admin_page: &'static str,
    pub check_document_display: &'static str,
    pub check_responsive: &'static str,
    pub check_error_handling: &'static str,
    pub check_notice_display: &'static str,
    pub check_notice_creation: &'static str,
    pub check_notices_crud: &'static str,
    pub check_documents_crud: &'static str,
    pub check_notice_validation: &'static str,
    pub check_document_validation: &'static str,
    /// Placeholder: `{path}`
    pub check_page_status: &'static str,
    /// Placeholder: `{path}`
    pub check_api_not_found: &'static str,

    /// Placeholder: `{count}`
    pub notices_found: &'static str,
    /// Placeholder: `{path}`
    pub results_written: &'static str,
}

pub static EN: Strings = Strings {
    suite_title: "Navy Display System - Browser Test Suite",
    starting_server: "Starting server...",
    waiting_for_server: "Waiting for server to start...",
    server_ready: "Server is ready!",
    server_timeout: "Server failed to start within {secs} seconds",
    server_start_failed: "Failed to start server: {error}",
    browser_setup_failed: "Failed to set up browser: {error}",
    environment_failed: "Failed to set up test environment",

    summary_title: "Test Results Summary",
    total_label: "Total Tests",
    passed_label: "Passed",
    failed_label: "Failed",
    success_rate_label: "Success Rate",
    all_passed: "All tests passed! System is working correctly.",
    some_failed: "Some tests failed. Please check the issues above.",

    check_api_health: "API Health Check",
    check_main_page: "Main Page Load",
    check_admin_page: "Admin Page Access",
    check_document_display: "Document Display",
    check_responsive: "Responsive Design",
    check_error_handling: "Error Handling (404)",
    check_notice_display: "Notice Functionality",
    check_notice_creation: "Notice Creation",
    check_notices_crud: "Notices CRUD",
    check_documents_crud: "Documents CRUD",
    check_notice_validation: "Notice Validation (invalid data)",
    check_document_validation: "Document Validation (invalid data)",
    check_page_status: "Page Status {path}",
    check_api_not_found: "API 404 {path}",

    notices_found: "{count} notice element(s) on page",
    results_written: "Results written to {path}",
};

pub static PT: Strings = Strings {
    suite_title: "Sistema de Visualização da Marinha - Suite de Testes de Navegador",
    starting_server: "Iniciando servidor...",
    waiting_for_server: "Aguardando servidor iniciar...",
    server_ready: "Servidor está pronto!",
    server_timeout: "Servidor falhou ao iniciar em {secs} segundos",
    server_start_failed: "Falha ao iniciar servidor: {error}",
    browser_setup_failed: "Falha ao configurar navegador: {error}",
    environment_failed: "Falha ao configurar ambiente de teste",

    summary_title: "Resumo dos Resultados dos Testes",
    total_label: "Total de Testes",
    passed_label: "Passou",
    failed_label: "Falhou",
    success_rate_label: "Taxa de Sucesso",
    all_passed: "Todos os testes passaram! Sistema está funcionando corretamente.",
    some_failed: "Alguns testes falharam. Verifique os problemas acima.",

    check_api_health: "Verificação de Saúde da API",
    check_main_page: "Carregamento da Página Principal",
    check_admin_page: "Acesso à Página Admin",
    check_document_display: "Exibição de Documentos",
    check_responsive: "Design Responsivo",
    check_error_handling: "Tratamento de Erro (404)",
    check_notice_display: "Funcionalidade de Avisos",
    check_notice_creation: "Criação de Aviso",
    check_notices_crud: "CRUD de Avisos",
    check_documents_crud: "CRUD de Documentos",
    check_notice_validation: "Validação de Aviso (dados inválidos)",
    check_document_validation: "Validação de Documento (dados inválidos)",
    check_page_status: "Status da Página {path}",
    check_api_not_found: "API 404 {path}",

    notices_found: "{count} elemento(s) de aviso na página",
    results_written: "Resultados gravados em {path}",
};

/// Replace `{key}` placeholders in a template
pub fn fill(template: &str, args: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (key, value) in args {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_placeholders() {
        let text = fill(EN.server_timeout, &[("secs", 30.to_string())]);
        assert_eq!(text, "Server failed to start within 30 seconds");

        let text = fill(PT.server_timeout, &[("secs", 5.to_string())]);
        assert_eq!(text, "Servidor falhou ao iniciar em 5 segundos");
    }

    #[test]
    fn test_unknown_placeholder_left_alone() {
        assert_eq!(fill("a {b} c", &[("x", "1".to_string())]), "a {b} c");
    }

    #[test]
    fn test_locale_selects_table() {
        assert_eq!(Locale::En.strings().check_api_health, "API Health Check");
        assert_eq!(Locale::Pt.strings().check_api_health, "Verificação de Saúde da API");
    }

    #[test]
    fn test_locale_parses_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            locale: Locale,
        }
        let w: Wrapper = toml::from_str(r#"locale = "pt""#).unwrap();
        assert_eq!(w.locale, Locale::Pt);
    }
}
