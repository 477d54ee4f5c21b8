//! Required-parameter validation

use super::error::DispatchError;
use super::types::{ParamDescriptor, ParameterMap};

/// Make sure every required parameter has at least one raw value.
///
/// A missing required parameter with a non-blank default gets the default
/// inserted as a single value; without one the request is rejected.
/// Optional parameters are left untouched.
pub fn verify_required(
    params: &mut ParameterMap,
    descriptors: &[ParamDescriptor],
) -> Result<(), DispatchError> {
    for descriptor in descriptors.iter().filter(|d| d.required) {
        let present = params
            .get(&descriptor.name)
            .is_some_and(|values| !values.is_empty());
        if present {
            continue;
        }

        match descriptor
            .default_value
            .as_deref()
            .filter(|default| !default.trim().is_empty())
        {
            Some(default) => {
                params.insert(descriptor.name.clone(), vec![default.to_string()]);
            }
            None => return Err(DispatchError::MissingParameter(descriptor.name.clone())),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::types::{ParamType, ScalarType};

    const TEXT: ParamType = ParamType::Scalar(ScalarType::Text);

    #[test]
    fn test_default_inserted() {
        let mut params = ParameterMap::new();
        let descriptors = [ParamDescriptor::required("name", TEXT).with_default("guest")];

        verify_required(&mut params, &descriptors).unwrap();
        assert_eq!(params.get("name"), Some(&vec!["guest".to_string()]));
    }

    #[test]
    fn test_empty_value_list_uses_default() {
        let mut params = ParameterMap::new();
        params.insert("name".to_string(), Vec::new());
        let descriptors = [ParamDescriptor::required("name", TEXT).with_default("guest")];

        verify_required(&mut params, &descriptors).unwrap();
        assert_eq!(params["name"], vec!["guest".to_string()]);
    }

    #[test]
    fn test_present_value_kept() {
        let mut params = ParameterMap::new();
        params.insert("name".to_string(), vec!["alice".to_string()]);
        let descriptors = [ParamDescriptor::required("name", TEXT).with_default("guest")];

        verify_required(&mut params, &descriptors).unwrap();
        assert_eq!(params["name"], vec!["alice".to_string()]);
    }

    #[test]
    fn test_missing_without_default() {
        let mut params = ParameterMap::new();
        let descriptors = [ParamDescriptor::required("id", TEXT)];

        let err = verify_required(&mut params, &descriptors).unwrap_err();
        assert_eq!(err.to_string(), "Required parameter 'id' is not present.");
    }

    #[test]
    fn test_blank_default_is_missing() {
        let mut params = ParameterMap::new();
        let descriptors = [ParamDescriptor::required("id", TEXT).with_default("   ")];

        assert!(matches!(
            verify_required(&mut params, &descriptors),
            Err(DispatchError::MissingParameter(name)) if name == "id"
        ));
        assert!(params.is_empty());
    }

    #[test]
    fn test_optional_untouched() {
        let mut params = ParameterMap::new();
        let descriptors = [ParamDescriptor::optional("age", TEXT).with_default("1")];

        verify_required(&mut params, &descriptors).unwrap();
        assert!(!params.contains_key("age"));
    }
}
