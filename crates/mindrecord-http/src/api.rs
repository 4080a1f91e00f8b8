//! Tests, results and account endpoints.

use tracing::{debug, instrument};

use mindrecord_core::Result;

use crate::client::{ApiClient, FormBody, RequestSpec};
use crate::endpoints::{self, MessageResponse, SubmissionReceipt, Test, TestResult, UserInfo};

impl ApiClient {
    /// All published tests.
    #[instrument(skip(self))]
    pub async fn list_tests(&self) -> Result<Vec<Test>> {
        let tests: Vec<Test> = self.request_json(RequestSpec::get(endpoints::TESTS)).await?;
        debug!(count = tests.len(), "Listed tests");
        Ok(tests)
    }

    #[instrument(skip(self))]
    pub async fn get_test(&self, id: &str) -> Result<Test> {
        self.request_json(RequestSpec::get(endpoints::test(id))).await
    }

    #[instrument(skip(self))]
    pub async fn get_result(&self, id: &str) -> Result<TestResult> {
        self.request_json(RequestSpec::get(endpoints::result(id))).await
    }

    /// Processing log of a result, as plain text.
    #[instrument(skip(self))]
    pub async fn get_result_log(&self, id: &str) -> Result<String> {
        let spec = RequestSpec::get(endpoints::result_log(id))
            .authenticated()
            .text();
        Ok(self.request(spec).await?.into_text())
    }

    /// Error log of a result, as plain text.
    #[instrument(skip(self))]
    pub async fn get_result_error_log(&self, id: &str) -> Result<String> {
        let spec = RequestSpec::get(endpoints::result_error_log(id))
            .authenticated()
            .text();
        Ok(self.request(spec).await?.into_text())
    }

    /// Submit the outputs of a test run. The server accepts the submission
    /// and processes it in the background.
    #[instrument(skip(self, outputs), fields(count = outputs.len()))]
    pub async fn submit_results(
        &self,
        test_id: &str,
        outputs: FormBody,
    ) -> Result<SubmissionReceipt> {
        let spec = RequestSpec::post(endpoints::test_results(test_id))
            .authenticated()
            .form(outputs);
        let receipt: SubmissionReceipt = self.request_json(spec).await?;
        debug!(results_id = %receipt.results_id, "Results submitted");
        Ok(receipt)
    }

    /// Id and role of the authenticated user, as the server sees them.
    #[instrument(skip(self))]
    pub async fn current_user_info(&self) -> Result<UserInfo> {
        self.request_json(RequestSpec::get(endpoints::USER).authenticated())
            .await
    }

    /// Confirm an email address with the token from the verification link.
    #[instrument(skip_all)]
    pub async fn verify_email(&self, token: &str) -> Result<MessageResponse> {
        let spec = RequestSpec::get(endpoints::VERIFY_EMAIL).query("token", token);
        self.request_json(spec).await
    }
}
