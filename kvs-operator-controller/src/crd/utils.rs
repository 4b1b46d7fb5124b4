// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use kube::CustomResourceExt;
use kube::core::crd::merge_crds;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;

use crate::crd::v1alpha1::keyvault_secret::KeyvaultSecret as V1Alpha1KeyvaultSecret;
use crate::error::{ControllerError, Result};


/// Build the CRDs served by the operator, one per kind with all versions merged
pub fn crds() -> Result<Vec<CustomResourceDefinition>> {
    Ok(vec![
        merge_crds(vec![V1Alpha1KeyvaultSecret::crd()], "v1alpha1")
            .map_err(|e| ControllerError::UnknownError(e.to_string()))?,
    ])
}

/// Render the CRDs as a multi-document YAML stream
pub fn render_crds() -> Result<String> {
    let mut out = String::new();
    for crd in crds()? {
        out.push_str("---\n");
        out.push_str(
            &serde_norway::to_string(&crd).map_err(|e| ControllerError::UnknownError(e.to_string()))?
        );
    }
    Ok(out)
}

/// Generate the CRDs for the operator
pub fn generate_crds() -> Result<()> {
    print!("{}", render_crds()?);
    Ok(())
}
