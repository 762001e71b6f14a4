use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, Data, DeriveInput, ImplItem, ImplItemFn, ItemImpl, Stmt,
    Variant, Visibility,
};

/// Turns a plain enum into a Capture SDK error type.
///
/// The attribute:
/// 1. Adds `#[derive(Debug, thiserror::Error, uniffi::Error)]` and `#[uniffi(flat_error)]`
/// 2. Appends a `Generic { message: String }` variant unless one is declared
/// 3. Implements `From<anyhow::Error>`, folding the error chain into `message`
///
/// # Usage
///
/// ```rust,ignore
/// #[capture_error]
/// pub enum SessionError {
///     #[error("session is not configured")]
///     NotConfigured,
///     #[error("no access token for {user_id}")]
///     MissingAccessToken { user_id: String },
/// }
/// ```
#[proc_macro_attribute]
pub fn capture_error(_args: TokenStream, input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let Data::Enum(data_enum) = &input.data else {
        return syn::Error::new_spanned(
            &input,
            "capture_error can only be applied to enums",
        )
        .to_compile_error()
        .into();
    };

    let enum_name = &input.ident;
    let visibility = &input.vis;
    let generics = &input.generics;

    // derive and uniffi attributes are re-emitted below
    let attrs: Vec<_> = input
        .attrs
        .iter()
        .filter(|attr| {
            !attr.path().is_ident("derive") && !attr.path().is_ident("uniffi")
        })
        .collect();

    let mut variants = data_enum.variants.clone();
    if !variants.iter().any(|variant| variant.ident == "Generic") {
        let generic_variant: Variant = syn::parse_quote! {
            /// Any other failure, carrying the flattened `anyhow` chain.
            #[error("Generic error: {message}")]
            Generic {
                /// The error message including its causes.
                message: String
            }
        };
        variants.push(generic_variant);
    }

    quote! {
        #[derive(Debug, thiserror::Error, uniffi::Error)]
        #[uniffi(flat_error)]
        #(#attrs)*
        #visibility enum #enum_name #generics {
            #variants
        }

        impl #generics From<anyhow::Error> for #enum_name #generics {
            fn from(err: anyhow::Error) -> Self {
                let mut message = err.to_string();
                let chain: Vec<String> = err.chain().skip(1).map(|e| e.to_string()).collect();
                if !chain.is_empty() {
                    message.push_str(" (caused by: ");
                    message.push_str(&chain.join(" -> "));
                    message.push(')');
                }
                Self::Generic { message }
            }
        }
    }
    .into()
}

/// Wraps `uniffi::export` and gives every exported method a logging context.
///
/// Each `pub fn` in the impl block starts with
/// `let _capture_logger_ctx = crate::primitives::logger::LogContext::new("TypeName");`
/// so that the crate's `info!`/`debug!`/... macros prefix their output with
/// `[Capture][TypeName]`. Private helpers are left untouched.
///
/// Async methods are rejected: a thread-local context must not be held across
/// `.await` points.
///
/// ```rust,ignore
/// #[capture_export]
/// impl CaptureSession {
///     pub fn client_id(&self) -> Result<String, CaptureError> {
///         debug!("reading client id"); // "[Capture][CaptureSession] reading client id"
///         ...
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn capture_export(args: TokenStream, input: TokenStream) -> TokenStream {
    let input_impl = parse_macro_input!(input as ItemImpl);

    if let Some(method) = first_public_async_fn(&input_impl.items) {
        return syn::Error::new_spanned(
            &method.sig,
            "capture_export does not support async methods",
        )
        .to_compile_error()
        .into();
    }

    let type_name = type_name_of(&input_impl);

    let items = input_impl
        .items
        .iter()
        .map(|item| match item {
            ImplItem::Fn(method) if matches!(method.vis, Visibility::Public(_)) => {
                let mut method = method.clone();
                inject_logging_context(&mut method, &type_name);
                ImplItem::Fn(method)
            }
            other => other.clone(),
        })
        .collect();

    let new_impl = ItemImpl {
        items,
        ..input_impl
    };
    let args = proc_macro2::TokenStream::from(args);

    quote! {
        #[uniffi::export(#args)]
        #new_impl
    }
    .into()
}

/// Name of the implementing type, used as the log context label.
fn type_name_of(input_impl: &ItemImpl) -> String {
    match &*input_impl.self_ty {
        syn::Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map_or_else(|| "Unknown".to_string(), |segment| segment.ident.to_string()),
        _ => "Unknown".to_string(),
    }
}

fn first_public_async_fn(impl_items: &[ImplItem]) -> Option<&ImplItemFn> {
    impl_items.iter().find_map(|item| match item {
        ImplItem::Fn(method)
            if matches!(method.vis, Visibility::Public(_))
                && method.sig.asyncness.is_some() =>
        {
            Some(method)
        }
        _ => None,
    })
}

fn inject_logging_context(method: &mut ImplItemFn, type_name: &str) {
    let context_stmt: Stmt = syn::parse_quote! {
        let _capture_logger_ctx = crate::primitives::logger::LogContext::new(#type_name);
    };
    method.block.stmts.insert(0, context_stmt);
}
