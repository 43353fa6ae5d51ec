use crate::api::{ChatRequest, ModelId, ToolDeclaration};
use crate::core::error::ClientError;
use crate::core::message::Message;

/// Assembles a request whose input is `context ++ transcript`.
///
/// The context is prepended on every call and never stored in the
/// transcript. An empty tool list is treated as no tools.
pub fn build_request(
    model: &ModelId,
    context: &[Message],
    transcript: &[Message],
    streaming: bool,
    tools: Option<&[ToolDeclaration]>,
) -> Result<ChatRequest, ClientError> {
    if context.is_empty() && transcript.is_empty() {
        return Err(ClientError::InvalidRequest(
            "request input must contain at least one message".to_string(),
        ));
    }

    let mut input = Vec::with_capacity(context.len() + transcript.len());
    input.extend_from_slice(context);
    input.extend_from_slice(transcript);

    let tools = tools.filter(|tools| !tools.is_empty()).map(<[_]>::to_vec);

    Ok(ChatRequest::new(model.clone(), input, streaming, tools))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::system_context;

    #[test]
    fn context_is_prepended_to_transcript() {
        let context = system_context(["rules"]);
        let transcript = vec![Message::assistant("hi"), Message::user("help")];

        let request = build_request(
            &ModelId::from("gpt-4o"),
            &context,
            &transcript,
            true,
            None,
        )
        .unwrap();

        assert_eq!(request.input().len(), 3);
        assert_eq!(request.input()[0], Message::system("rules"));
        assert_eq!(&request.input()[1..], transcript.as_slice());
        assert!(request.is_streaming());
        assert_eq!(request.model().as_str(), "gpt-4o");
    }

    #[test]
    fn empty_input_is_rejected() {
        let result = build_request(&ModelId::from("gpt-4o"), &[], &[], false, None);
        assert!(matches!(result, Err(ClientError::InvalidRequest(_))));
    }

    #[test]
    fn tools_are_carried_unless_empty() {
        let transcript = vec![Message::user("weather?")];
        let tools = vec![ToolDeclaration::web_search()];
        let model = ModelId::from("gpt-4o");

        let with_tools = build_request(&model, &[], &transcript, true, Some(&tools)).unwrap();
        assert_eq!(with_tools.tools(), Some(tools.as_slice()));

        let empty = build_request(&model, &[], &transcript, true, Some(&[])).unwrap();
        assert!(empty.tools().is_none());
    }
}
