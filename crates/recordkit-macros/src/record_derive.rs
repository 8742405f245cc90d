//! Implementation of the Record derive macro.
//!
//! The struct is parsed into the same [`RecordShape`] the runtime accepts, run
//! through the core extractor and synthesizer, and the resulting description is
//! rendered into a typed builder. Shape errors surface as compile errors on the
//! struct name.

use proc_macro2::TokenStream;
use quote::{ToTokens, format_ident, quote};
use recordkit_core::config::SynthOptions;
use recordkit_core::field::{FieldDecl, RecordShape, extract};
use recordkit_core::synth::{SynthesizedType, synthesize};
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Error, Field, Fields, Ident, Lit, Result, Type, Visibility};

/// Parsed definition of a struct with `#[derive(Record)]`.
#[derive(Debug)]
pub struct RecordDef {
    /// The struct name.
    pub name: Ident,
    /// Struct visibility, reused for the builder.
    pub vis: Visibility,
    /// Generics from the struct.
    pub generics: syn::Generics,
    /// Fields in declaration order, skipped ones included.
    pub fields: Vec<RecordFieldDef>,
    /// Naming and extraction options from `#[record(...)]` on the struct.
    pub options: SynthOptions,
    /// Path to the recordkit crate in generated code.
    pub krate: syn::Path,
}

/// A parsed struct field.
#[derive(Debug)]
pub struct RecordFieldDef {
    /// The field identifier (possibly raw).
    pub ident: Ident,
    /// The field type.
    pub ty: Type,
    /// `#[record(required)]`
    pub required: bool,
    /// `#[record(skip)]`, or a `PhantomData` field.
    pub skip: bool,
}

impl RecordFieldDef {
    /// Field name with any `r#` prefix removed.
    pub fn name(&self) -> String {
        self.ident.unraw().to_string()
    }
}

/// Parse a `DeriveInput` into a `RecordDef`.
pub fn parse_record(input: &DeriveInput) -> Result<RecordDef> {
    let (options, krate) = parse_container_attrs(input)?;

    let fields = match &input.data {
        Data::Struct(data) => parse_record_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Record can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Record can only be derived for structs, not unions",
            ));
        }
    };

    Ok(RecordDef {
        name: input.ident.clone(),
        vis: input.vis.clone(),
        generics: input.generics.clone(),
        fields,
        options,
        krate,
    })
}

/// Parse `#[record(...)]` on the struct itself.
fn parse_container_attrs(input: &DeriveInput) -> Result<(SynthOptions, syn::Path)> {
    let mut options = SynthOptions::default();
    let mut krate: syn::Path = syn::parse_quote!(::recordkit);

    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;

            if path.is_ident("builder") {
                let value: Lit = meta.value()?.parse()?;
                options.builder_name = Some(parse_str_lit(&value)?);
            } else if path.is_ident("builder_suffix") {
                let value: Lit = meta.value()?.parse()?;
                options.builder_suffix = parse_str_lit(&value)?;
            } else if path.is_ident("setter_prefix") {
                let value: Lit = meta.value()?.parse()?;
                options.setter_prefix = parse_str_lit(&value)?;
            } else if path.is_ident("max_fields") {
                let value: Lit = meta.value()?.parse()?;
                options.extract.max_fields = Some(parse_usize_lit(&value)?);
            } else if path.is_ident("crate") {
                let value: Lit = meta.value()?.parse()?;
                let path_str = parse_str_lit(&value)?;
                krate = syn::parse_str(&path_str)
                    .map_err(|e| Error::new_spanned(&value, format!("invalid crate path: {e}")))?;
            } else {
                let attr_name = path.to_token_stream().to_string();
                return Err(Error::new_spanned(
                    path,
                    format!(
                        "unknown record attribute `{attr_name}`. \
                         Valid struct attributes are: builder, builder_suffix, \
                         setter_prefix, max_fields, crate"
                    ),
                ));
            }

            Ok(())
        })?;
    }

    Ok((options, krate))
}

/// Parse all fields of the struct.
fn parse_record_fields(fields: &Fields) -> Result<Vec<RecordFieldDef>> {
    match fields {
        Fields::Named(named) => named.named.iter().map(parse_record_field).collect(),
        Fields::Unnamed(_) => Err(Error::new_spanned(
            fields,
            "Record requires a struct with named fields",
        )),
        Fields::Unit => Ok(Vec::new()),
    }
}

/// Parse a single field and its `#[record(...)]` attributes.
/// Name of the builder's own bookkeeping field.
const STATE_FIELD: &str = "__recordkit_state";

fn parse_record_field(field: &Field) -> Result<RecordFieldDef> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    if ident == STATE_FIELD {
        return Err(Error::new_spanned(
            &ident,
            format!("`{STATE_FIELD}` is reserved for the generated builder"),
        ));
    }

    let mut required = false;
    let mut skip = is_phantom_data(&field.ty);

    for attr in &field.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;

            if path.is_ident("required") {
                required = true;
            } else if path.is_ident("skip") {
                skip = true;
            } else {
                let attr_name = path.to_token_stream().to_string();
                return Err(Error::new_spanned(
                    path,
                    format!(
                        "unknown record attribute `{attr_name}`. \
                         Valid field attributes are: required, skip"
                    ),
                ));
            }

            Ok(())
        })?;
    }

    if required && skip {
        return Err(Error::new_spanned(
            &ident,
            "a skipped field cannot be required",
        ));
    }

    Ok(RecordFieldDef {
        ident,
        ty: field.ty.clone(),
        required,
        skip,
    })
}

/// Parse a string literal.
fn parse_str_lit(lit: &Lit) -> Result<String> {
    match lit {
        Lit::Str(lit_str) => Ok(lit_str.value()),
        _ => Err(Error::new_spanned(lit, "expected string literal")),
    }
}

/// Parse a numeric literal to usize.
fn parse_usize_lit(lit: &Lit) -> Result<usize> {
    match lit {
        Lit::Int(int_lit) => int_lit
            .base10_parse::<usize>()
            .map_err(|e| Error::new_spanned(lit, format!("invalid integer: {e}"))),
        _ => Err(Error::new_spanned(lit, "expected integer literal")),
    }
}

/// Check if a type is `PhantomData<T>`.
fn is_phantom_data(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == "PhantomData";
        }
    }
    false
}

/// Render a type the way it reads in source, e.g. `Option<String>`.
fn type_name(ty: &Type) -> String {
    ty.to_token_stream()
        .to_string()
        .replace(" <", "<")
        .replace("< ", "<")
        .replace(" >", ">")
        .replace(" ,", ",")
        .replace(" :: ", "::")
        .replace(":: ", "::")
        .replace("& ", "&")
}

/// The shape handed to the descriptor extractor.
///
/// Skipped fields are declared static: they belong to the struct but not to
/// its builder.
pub fn record_shape(def: &RecordDef) -> RecordShape {
    RecordShape {
        name: def.name.to_string(),
        fields: def
            .fields
            .iter()
            .map(|f| FieldDecl {
                name: f.name(),
                ty: type_name(&f.ty),
                required: f.required,
                is_static: f.skip,
            })
            .collect(),
    }
}

/// Run extraction and synthesis for the struct.
pub fn synthesize_record(def: &RecordDef) -> Result<SynthesizedType> {
    let shape = record_shape(def);
    let descriptors = extract(&shape, &def.options.extract)
        .map_err(|e| Error::new_spanned(&def.name, e.to_string()))?;
    synthesize(&descriptors, &def.options).map_err(|e| Error::new_spanned(&def.name, e.to_string()))
}

/// Generate the record and builder implementations.
pub fn generate_record_impl(def: &RecordDef) -> Result<TokenStream> {
    let synthesized = synthesize_record(def)?;

    let krate = &def.krate;
    let name = &def.name;
    let name_str = name.to_string();
    let vis = &def.vis;
    let (impl_generics, ty_generics, where_clause) = def.generics.split_for_impl();

    let builder: Ident = syn::parse_str(&synthesized.builder).map_err(|_| {
        Error::new_spanned(
            name,
            format!("`{}` is not a valid builder name", synthesized.builder),
        )
    })?;
    let builder_doc = format!("Builder for [`{name_str}`].");

    let kept: Vec<&RecordFieldDef> = def.fields.iter().filter(|f| !f.skip).collect();
    let skipped: Vec<&Ident> = def
        .fields
        .iter()
        .filter(|f| f.skip)
        .map(|f| &f.ident)
        .collect();
    let field_count = kept.len();

    let mut descriptors = Vec::with_capacity(field_count);
    let mut storage = Vec::with_capacity(field_count);
    let mut setters = Vec::with_capacity(field_count);
    let mut required_takes = Vec::new();
    let mut fresh_values = Vec::with_capacity(field_count);
    let mut diffs = Vec::with_capacity(field_count);
    let mut derived_values = Vec::with_capacity(field_count);
    let idents: Vec<&Ident> = kept.iter().map(|f| &f.ident).collect();
    let mut bindings = Vec::with_capacity(field_count);

    for (field, setter) in kept.iter().zip(&synthesized.setters) {
        let ident = &field.ident;
        let ty = &field.ty;
        let field_name = &setter.field;
        let ty_name = &setter.param_type;
        let required = setter.required;
        let ordinal = setter.ordinal;
        let method = Ident::new(&setter.method, ident.span());
        let query = Ident::new(&setter.query, ident.span());
        // Field values live in generated locals so user field names never
        // shadow the locals of `build`.
        let local = format_ident!("__recordkit_v{}", ordinal);
        let setter_doc = format!("Assign `{field_name}`.");
        let query_doc = format!("Whether `{field_name}` was assigned on this builder.");

        descriptors.push(quote! {
            #krate::FieldDescriptor::new(#field_name, #ty_name, #required, #ordinal)
        });
        storage.push(quote! {
            #ident: ::core::option::Option<#ty>
        });
        setters.push(quote! {
            #[doc = #setter_doc]
            pub fn #method(mut self, value: impl ::core::convert::Into<#ty>) -> Self {
                self.#ident = ::core::option::Option::Some(value.into());
                self.__recordkit_state.mark(#ordinal);
                self
            }

            #[doc = #query_doc]
            pub fn #query(&self) -> bool {
                self.__recordkit_state.is_assigned(#ordinal)
            }
        });

        bindings.push(quote! { #ident: #local });
        if required {
            required_takes.push(quote! {
                let #local = __state.require(__record, &__fields[#ordinal], #local)?;
            });
            fresh_values.push(quote! { #ident: #local });
        } else {
            fresh_values.push(quote! { #ident: #local.unwrap_or_default() });
        }
        diffs.push(quote! {
            __state.differs(#ordinal, #local.as_ref(), &__origin.#ident)
        });
        derived_values.push(quote! {
            #ident: #local.unwrap_or_else(|| ::core::clone::Clone::clone(&__origin.#ident))
        });
    }

    Ok(quote! {
        impl #impl_generics #krate::Record for #name #ty_generics #where_clause {
            const NAME: &'static str = #name_str;

            type Builder = #builder #ty_generics;

            fn fields() -> &'static [#krate::FieldDescriptor] {
                static FIELDS: [#krate::FieldDescriptor; #field_count] = [#(#descriptors),*];
                &FIELDS
            }
        }

        impl #impl_generics #name #ty_generics #where_clause {
            /// Start a fresh builder.
            #vis fn builder() -> #builder #ty_generics {
                #builder::new()
            }
        }

        #[doc = #builder_doc]
        #[allow(non_snake_case)]
        #vis struct #builder #impl_generics #where_clause {
            __recordkit_state: #krate::BuildState<#name #ty_generics>,
            #(#storage,)*
        }

        impl #impl_generics #builder #ty_generics #where_clause {
            /// A builder with no origin; `build()` checks required fields.
            pub fn new() -> Self {
                Self {
                    __recordkit_state: #krate::BuildState::fresh(#field_count),
                    #(#idents: ::core::option::Option::None,)*
                }
            }

            /// A builder deriving from `origin`; `build()` returns `origin`
            /// itself when no assigned value differs from it.
            pub fn from_origin(origin: ::std::sync::Arc<#name #ty_generics>) -> Self {
                Self {
                    __recordkit_state: #krate::BuildState::derived(origin, #field_count),
                    #(#idents: ::core::option::Option::None,)*
                }
            }

            #(#setters)*

            /// Finish the builder.
            pub fn build(
                self,
            ) -> ::core::result::Result<::std::sync::Arc<#name #ty_generics>, #krate::ValidationError> {
                <Self as #krate::RecordBuilder>::build(self)
            }
        }

        impl #impl_generics ::core::default::Default for #builder #ty_generics #where_clause {
            fn default() -> Self {
                Self::new()
            }
        }

        impl #impl_generics #krate::RecordBuilder for #builder #ty_generics #where_clause {
            type Record = #name #ty_generics;

            fn fresh() -> Self {
                Self::new()
            }

            fn derived(origin: ::std::sync::Arc<#name #ty_generics>) -> Self {
                Self::from_origin(origin)
            }

            fn build(
                self,
            ) -> ::core::result::Result<::std::sync::Arc<#name #ty_generics>, #krate::ValidationError> {
                let __record = <#name #ty_generics as #krate::Record>::NAME;
                let __fields = <#name #ty_generics as #krate::Record>::fields();
                let Self {
                    __recordkit_state: __state,
                    #(#bindings,)*
                } = self;

                match __state.origin().cloned() {
                    ::core::option::Option::None => {
                        __state.missing_required(__record, __fields)?;
                        #(#required_takes)*
                        ::core::result::Result::Ok(__state.finish(__record, #name {
                            #(#fresh_values,)*
                            #(#skipped: ::core::default::Default::default(),)*
                        }))
                    }
                    ::core::option::Option::Some(__origin) => {
                        let __changed = false #(|| #diffs)*;
                        if !__changed {
                            return ::core::result::Result::Ok(__state.unchanged(__record, __origin));
                        }
                        ::core::result::Result::Ok(__state.finish(__record, #name {
                            #(#derived_values,)*
                            #(#skipped: ::core::clone::Clone::clone(&__origin.#skipped),)*
                        }))
                    }
                }
            }
        }
    })
}
