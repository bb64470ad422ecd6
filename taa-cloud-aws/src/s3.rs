//! S3 object store

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::time::Duration;
use taa_runtime::{Error, ObjectLocation, ObjectStore, Result};
use tracing::{debug, instrument};

/// Characters left unescaped in a `CopySource` header
const COPY_SOURCE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(sdk: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

/// Value of the `CopySource` header for an object
pub fn copy_source(location: &ObjectLocation) -> String {
    format!(
        "{}/{}",
        location.bucket,
        utf8_percent_encode(&location.key, COPY_SOURCE)
    )
}

fn is_not_found<E, R>(err: &SdkError<E, R>) -> bool
where
    E: ProvideErrorMetadata,
{
    match err {
        SdkError::ServiceError(service) => matches!(
            service.err().code(),
            Some("NoSuchKey") | Some("NoSuchBucket") | Some("NotFound")
        ),
        _ => false,
    }
}

fn storage_error<E, R>(op: &str, location: &ObjectLocation, err: SdkError<E, R>) -> Error
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    Error::Storage(format!("{} {}: {}", op, location, DisplayErrorContext(&err)))
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    #[instrument(skip(self), fields(location = %location))]
    async fn get_object(&self, location: &ObjectLocation) -> Result<Vec<u8>> {
        let output = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    Error::ResourceUnavailable(format!("{} does not exist", location))
                } else {
                    storage_error("get", location, e)
                }
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| Error::Storage(format!("read {}: {}", location, e)))?
            .into_bytes();
        debug!(size = bytes.len(), "Fetched object");
        Ok(bytes.to_vec())
    }

    #[instrument(skip(self, body), fields(location = %location, size = body.len()))]
    async fn put_object(
        &self,
        location: &ObjectLocation,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        self.client
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| storage_error("put", location, e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(source = %source, dest = %dest))]
    async fn copy_object(&self, source: &ObjectLocation, dest: &ObjectLocation) -> Result<()> {
        self.client
            .copy_object()
            .copy_source(copy_source(source))
            .bucket(&dest.bucket)
            .key(&dest.key)
            .send()
            .await
            .map_err(|e| {
                Error::Storage(format!(
                    "copy {} to {}: {}",
                    source,
                    dest,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                Error::Storage(format!(
                    "list s3://{}/{}: {}",
                    bucket,
                    prefix,
                    DisplayErrorContext(&e)
                ))
            })?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );
        }
        keys.sort();
        Ok(keys)
    }

    #[instrument(skip(self), fields(location = %location))]
    async fn delete_object(&self, location: &ObjectLocation) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| storage_error("delete", location, e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(location = %location))]
    async fn presign_get(&self, location: &ObjectLocation, expires_in: Duration) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| Error::InvalidInput(format!("presign expiry {:?}: {}", expires_in, e)))?;

        let request = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .presigned(presigning)
            .await
            .map_err(|e| storage_error("presign", location, e))?;
        Ok(request.uri().to_string())
    }
}
