use crate::client::{ClientError, ClientResult, ImageUploader, ProfileApi, UploadedImage};
use crate::db::Profile;
use crate::validation::{self, ProfileFormData, ProfileUpdate, ValidationReport};

/// Submission progress of a [`ProfileForm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    Idle,
    Validating,
    Submitting,
    Success,
    Error(String),
}

/// An image picked in the form, uploaded on submit.
#[derive(Debug, Clone)]
pub struct ChosenImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Profile edit form. Submission runs
/// `Idle -> Validating -> Submitting -> Success | Error`.
#[derive(Debug)]
pub struct ProfileForm {
    pub data: ProfileFormData,
    image: Option<ChosenImage>,
    /// Upload of `image` that has not been saved to the profile yet.
    uploaded: Option<UploadedImage>,
    state: FormState,
    errors: ValidationReport,
    uploader: ImageUploader,
}

impl Default for ProfileForm {
    fn default() -> Self {
        Self::new(ProfileFormData::default())
    }
}

impl ProfileForm {
    pub fn new(data: ProfileFormData) -> Self {
        Self {
            data,
            image: None,
            uploaded: None,
            state: FormState::Idle,
            errors: ValidationReport::default(),
            uploader: ImageUploader::new(),
        }
    }

    /// Form pre-filled from a stored profile.
    pub fn from_profile(profile: &Profile) -> Self {
        Self::new(ProfileFormData {
            display_name: profile.display_name.clone().unwrap_or_default(),
            bio: profile.bio.clone().unwrap_or_default(),
            contact_email: profile.contact_email.clone().unwrap_or_default(),
        })
    }

    pub fn choose_image(&mut self, filename: impl Into<String>, bytes: Vec<u8>) {
        self.image = Some(ChosenImage {
            filename: filename.into(),
            bytes,
        });
        self.uploaded = None;
    }

    pub fn chosen_image(&self) -> Option<&ChosenImage> {
        self.image.as_ref()
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Field errors from the last validation, empty when it passed.
    pub fn errors(&self) -> &ValidationReport {
        &self.errors
    }

    pub fn is_uploading(&self) -> bool {
        self.uploader.is_busy()
    }

    /// Return to `Idle` after a submission was abandoned mid-flight.
    pub fn reset(&mut self) {
        self.state = FormState::Idle;
    }

    pub async fn submit<A: ProfileApi + ?Sized>(&mut self, api: &A) -> ClientResult<()> {
        if self.state == FormState::Submitting || self.uploader.is_busy() {
            return Err(ClientError::Busy);
        }

        self.state = FormState::Validating;
        if let Err(report) = validation::validate_profile_form(&self.data) {
            self.errors = report.clone();
            return self.fail(ClientError::Validation(report));
        }
        self.errors = ValidationReport::default();

        self.state = FormState::Submitting;

        let mut update = ProfileUpdate::from(self.data.clone());
        if let Some(image) = &self.image {
            // A retry after a failed update reuses the stored upload
            if self.uploaded.is_none() {
                match self
                    .uploader
                    .upload(api, &image.filename, image.bytes.clone())
                    .await
                {
                    Ok(uploaded) => self.uploaded = Some(uploaded),
                    Err(e) => return self.fail(e),
                }
            }
            update.profile_image_url = self.uploaded.as_ref().map(|u| u.url.clone());
        }

        if let Err(e) = api.update_profile(&update).await {
            if let ClientError::Validation(report) = &e {
                self.errors = report.clone();
            }
            return self.fail(e);
        }

        self.image = None;
        self.uploaded = None;
        self.state = FormState::Success;
        Ok(())
    }

    fn fail(&mut self, err: ClientError) -> ClientResult<()> {
        tracing::debug!("Profile form submission failed: {}", err);
        self.state = FormState::Error(err.to_string());
        Err(err)
    }
}
