// Builds the client from environment variables. Kept in its own test
// binary so no other test observes the modified environment.

use mailcow_admin::MailcowClient;

#[test]
fn from_env_reads_host_and_key() {
    std::env::set_var("MAILCOW_API_HOST", "https://mail.example.org/");
    std::env::set_var("MAILCOW_API_KEY", "env-key");

    let client = MailcowClient::from_env().expect("client from environment");
    assert_eq!(client.api_host(), "https://mail.example.org");
}
